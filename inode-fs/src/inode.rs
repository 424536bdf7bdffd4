//! # 句柄层
//!
//! [`Inode`] 是磁盘 inode 在内存中的代表，同一扇区上的所有打开者共享一个句柄。
//! 每个打开者持有一个 [`OpenInode`]，打开与关闭经由 [`InodeTable`](crate::InodeTable)，
//! 读写与写保护直接在句柄上进行。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Deref;

use block_dev::BlockDevice;
use enumflags2::bitflags;
use spin::{Mutex, RwLock};

use crate::layout::{DiskInode, InodeKind};
use crate::sector;
use crate::stream::Chunks;
use crate::SectorId;

pub struct Inode {
    /// inode 所在扇区，也是它的编号
    sector: SectorId,
    /// 首次打开时读入的磁盘记录，此后不再刷新
    disk: DiskInode,
    /// 读者共享，写者独占；写入是读-改-写，须与读者互斥
    io: RwLock<()>,
    state: Mutex<OpenState>,
    dev: Arc<dyn BlockDevice>,
}

/// 一个打开者。不能克隆，新增打开者只能用 [`OpenInode::reopen`]，
/// 用完须交给 [`InodeTable::close`](crate::InodeTable::close)。
#[must_use = "an opener must be closed through its InodeTable"]
pub struct OpenInode(Arc<Inode>);

#[derive(Debug)]
struct OpenState {
    /// 打开者个数
    open_cnt: usize,
    /// 最后一个打开者关闭时释放扇区
    removed: bool,
    /// 非零时拒绝写入
    deny_write_cnt: usize,
}

#[derive(Debug, Default)]
pub struct Stat {
    pub inode: u64,
    pub kind: StatKind,
    /// 文件长度(字节)
    pub size: u64,
    /// 占据的扇区数，含索引块与 inode 自身
    pub sectors: u64,
}

#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatKind {
    DIR = 0o040000,
    #[default]
    FILE = 0o100000,
}

impl Inode {
    pub(crate) fn new(sector: SectorId, disk: DiskInode, dev: Arc<dyn BlockDevice>) -> Self {
        Self {
            sector,
            disk,
            io: RwLock::new(()),
            state: Mutex::new(OpenState {
                open_cnt: 1,
                removed: false,
                deny_write_cnt: 0,
            }),
            dev,
        }
    }

    #[inline]
    pub fn inumber(&self) -> SectorId {
        self.sector
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.disk.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.disk.is_empty()
    }

    #[inline]
    pub fn kind(&self) -> InodeKind {
        self.disk.kind()
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind() == InodeKind::Directory
    }

    pub fn stat(&self) -> Stat {
        let data_sectors = DiskInode::sectors_required(self.len());
        Stat {
            inode: u32::from(self.sector).into(),
            kind: self.kind().into(),
            size: self.len() as u64,
            sectors: (DiskInode::total_allocation_units(data_sectors) + 1) as u64,
        }
    }

    /// 字节偏移 `offset` 所在的数据扇区，见 [`DiskInode::resolve`]
    pub fn resolve(&self, offset: usize) -> Option<SectorId> {
        let _io = self.io.read();
        self.disk.resolve(offset, &self.dev)
    }

    /// 标记删除，扇区待最后一个打开者关闭时才释放
    pub fn remove(&self) {
        self.state.lock().removed = true;
    }

    #[inline]
    pub fn is_removed(&self) -> bool {
        self.state.lock().removed
    }

    #[inline]
    pub fn open_count(&self) -> usize {
        self.state.lock().open_cnt
    }

    /// 禁止写入。每个打开者至多调用一次
    pub fn deny_write(&self) {
        let mut state = self.state.lock();
        state.deny_write_cnt += 1;
        assert!(state.deny_write_cnt <= state.open_cnt);
    }

    /// 恢复写入。调用过 [`Inode::deny_write`] 的打开者须在关闭前调用一次
    pub fn allow_write(&self) {
        let mut state = self.state.lock();
        assert!(state.deny_write_cnt > 0);
        assert!(state.deny_write_cnt <= state.open_cnt);
        state.deny_write_cnt -= 1;
    }

    #[inline]
    pub fn is_write_denied(&self) -> bool {
        self.state.lock().deny_write_cnt > 0
    }

    /// 从 `offset` 起读出数据填充 `buf`，返回实际读出的字节数。
    ///
    /// 读到文件末尾时返回值小于 `buf.len()`，这不是错误。
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> usize {
        let _io = self.io.read();
        if self.open_count() == 0 {
            log::warn!("inode {}: read after last close", self.sector);
            return 0;
        }

        let mut scratch = None;

        let mut read_size = 0;
        for chunk in Chunks::new(&self.disk, &self.dev, offset, buf.len()) {
            let dest = &mut buf[read_size..read_size + chunk.len];

            if chunk.is_whole() {
                self.dev.read_block(chunk.sector.block(), dest);
            } else {
                let Some(bounce) = bounce_buf(&mut scratch) else {
                    break;
                };
                self.dev.read_block(chunk.sector.block(), bounce);
                dest.copy_from_slice(&bounce[chunk.range()]);
            }

            read_size += chunk.len;
        }

        read_size
    }

    /// 从 `offset` 起写入 `buf`，返回实际写入的字节数。
    ///
    /// 写入不会让文件变长，超出长度的部分被截掉；禁止写入时返回 0。
    pub fn write_at(&self, offset: usize, buf: &[u8]) -> usize {
        let _io = self.io.write();
        {
            let state = self.state.lock();
            // 最后一个打开者关闭后，扇区可能已归还给别的文件
            if state.open_cnt == 0 {
                log::warn!("inode {}: write after last close", self.sector);
                return 0;
            }
            if state.deny_write_cnt > 0 {
                log::warn!("inode {}: write denied", self.sector);
                return 0;
            }
        }

        let mut scratch = None;

        let mut written_size = 0;
        for chunk in Chunks::new(&self.disk, &self.dev, offset, buf.len()) {
            let src = &buf[written_size..written_size + chunk.len];

            if chunk.is_whole() {
                self.dev.write_block(chunk.sector.block(), src);
            } else {
                let Some(bounce) = bounce_buf(&mut scratch) else {
                    break;
                };

                // 扇区内还有片段以外的数据就先读出来，否则从全零开始
                if chunk.is_partial() {
                    self.dev.read_block(chunk.sector.block(), bounce);
                } else {
                    bounce.fill(0);
                }
                bounce[chunk.range()].copy_from_slice(src);
                self.dev.write_block(chunk.sector.block(), bounce);
            }

            written_size += chunk.len;
        }

        written_size
    }
}

impl Inode {
    #[inline]
    pub(crate) fn disk(&self) -> &DiskInode {
        &self.disk
    }

    /// 新增一个打开者
    pub(crate) fn acquire(&self) {
        self.state.lock().open_cnt += 1;
    }

    /// 减少一个打开者，返回剩余的打开者个数
    pub(crate) fn release(&self) -> usize {
        let mut state = self.state.lock();
        assert!(state.open_cnt > 0, "close a closed inode");
        state.open_cnt -= 1;
        state.open_cnt
    }
}

impl OpenInode {
    #[inline]
    pub(crate) fn new(inode: Arc<Inode>) -> Self {
        Self(inode)
    }

    /// 新增一个打开者，与 `self` 共享同一个句柄
    pub fn reopen(&self) -> Self {
        let mut state = self.0.state.lock();
        assert!(state.open_cnt > 0, "reopen a closed inode");
        state.open_cnt += 1;
        Self(Arc::clone(&self.0))
    }

    /// 两个打开者是否共享同一个句柄
    #[inline]
    pub fn shares_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub(crate) fn handle(&self) -> &Arc<Inode> {
        &self.0
    }
}

impl Deref for OpenInode {
    type Target = Inode;

    #[inline]
    fn deref(&self) -> &Inode {
        &self.0
    }
}

/// 按需申请中转缓冲，申请不到时本次传输提前结束
fn bounce_buf(slot: &mut Option<Vec<u8>>) -> Option<&mut [u8]> {
    if slot.is_none() {
        match sector::scratch() {
            Ok(buf) => *slot = Some(buf),
            Err(err) => {
                log::warn!("{err}, transfer cut short");
                return None;
            }
        }
    }
    slot.as_deref_mut()
}

impl From<InodeKind> for StatKind {
    #[inline]
    fn from(kind: InodeKind) -> Self {
        match kind {
            InodeKind::Directory => Self::DIR,
            InodeKind::File => Self::FILE,
        }
    }
}
