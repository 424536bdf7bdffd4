//! # 打开表
//!
//! 挂载时建立、卸载时销毁，记录所有打开着的 [`Inode`]，
//! 保证同一扇区上的 inode 在内存中只有一个句柄。
//! 扇区的释放只会发生在最后一个打开者 [`InodeTable::close`] 时。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::alloc_tree;
use crate::layout::{DiskInode, InodeKind};
use crate::sector::SectorRecord;
use crate::{Error, FreeMap, Inode, OpenInode, Result, SectorId};

pub struct InodeTable {
    dev: Arc<dyn BlockDevice>,
    free_map: Mutex<Box<dyn FreeMap>>,
    /// 加锁顺序：先 `open_inodes` 后 `free_map`
    open_inodes: Mutex<Vec<Arc<Inode>>>,
}

impl InodeTable {
    pub fn new(dev: Arc<dyn BlockDevice>, free_map: impl FreeMap + 'static) -> Self {
        Self {
            dev,
            free_map: Mutex::new(Box::new(free_map)),
            open_inodes: Mutex::new(Vec::new()),
        }
    }

    /// 在 `sector` 上创建长度为 `length` 字节的文件 inode，并一次性分配好全部扇区。
    ///
    /// `sector` 本身由调用者事先申请。失败时不会留下任何被占用的扇区。
    #[inline]
    pub fn create(&self, sector: SectorId, length: usize) -> Result<()> {
        self.create_as(sector, length, InodeKind::File)
    }

    /// 同 [`InodeTable::create`]，但标记为目录
    #[inline]
    pub fn create_dir(&self, sector: SectorId, length: usize) -> Result<()> {
        self.create_as(sector, length, InodeKind::Directory)
    }

    /// 打开 `sector` 上的 inode。已打开时共享同一个句柄，不再读盘。
    ///
    /// 打开表的空位用 `try_reserve` 申请，申请不到时返回 [`Error::OutOfMemory`]；
    /// 句柄本身由 `Arc::new` 分配，`alloc` 没有可失败的版本，内存耗尽时照常中止。
    pub fn open(&self, sector: SectorId) -> Result<OpenInode> {
        self.check(sector)?;
        let mut open_inodes = self.open_inodes.lock();

        // 尝试从打开表中取出句柄
        if let Some(inode) = open_inodes
            .iter()
            .find(|inode| inode.inumber() == sector)
        {
            inode.acquire();
            return Ok(OpenInode::new(Arc::clone(inode)));
        }

        let disk = DiskInode::load(&self.dev, sector);
        if !disk.is_valid() {
            return Err(Error::BadMagic {
                sector,
                magic: disk.magic(),
            });
        }

        open_inodes
            .try_reserve(1)
            .map_err(|_| Error::OutOfMemory)?;
        let inode = Arc::new(Inode::new(sector, disk, self.dev.clone()));
        open_inodes.push(inode.clone());
        log::debug!("open inode {sector}: length {}", inode.len());

        Ok(OpenInode::new(inode))
    }

    /// 关闭一个打开者。最后一个打开者关闭时句柄离开打开表，
    /// 若已标记删除，则释放它的全部扇区。
    pub fn close(&self, opener: OpenInode) {
        let inode = opener.handle();
        let mut open_inodes = self.open_inodes.lock();
        if inode.release() > 0 {
            return;
        }

        if let Some(index) = open_inodes
            .iter()
            .position(|open| Arc::ptr_eq(open, inode))
        {
            open_inodes.swap_remove(index);
        }

        if inode.is_removed() {
            let released = alloc_tree::release_allocation(
                inode.disk(),
                inode.inumber(),
                &self.dev,
                &mut **self.free_map.lock(),
            );
            log::debug!("inode {} removed: {released} sectors released", inode.inumber());
        }
    }

    /// 打开着的句柄个数
    #[inline]
    pub fn open_count(&self) -> usize {
        self.open_inodes.lock().len()
    }

    /// 剩余的空闲扇区数
    #[inline]
    pub fn unused(&self) -> usize {
        self.free_map.lock().unused()
    }

    /// 申请一个扇区，供调用者存放新的 inode
    pub fn alloc_sector(&self) -> Option<SectorId> {
        self.free_map.lock().allocate(1)
    }

    /// 归还 [`InodeTable::alloc_sector`] 得到、但没能建成 inode 的扇区
    pub fn dealloc_sector(&self, sector: SectorId) {
        self.free_map.lock().release(sector, 1)
    }
}

impl InodeTable {
    fn check(&self, sector: SectorId) -> Result<()> {
        SectorId::checked(sector.block(), self.dev.num_blocks()).map(|_| ())
    }

    fn create_as(&self, sector: SectorId, length: usize, kind: InodeKind) -> Result<()> {
        self.check(sector)?;

        let result = u32::try_from(length)
            .map_err(|_| Error::TooLarge {
                required: DiskInode::total_allocation_units(DiskInode::sectors_required(length)),
            })
            .and_then(|length| {
                let mut disk = DiskInode::new(length, kind);
                alloc_tree::create_allocation(&mut disk, &self.dev, &mut **self.free_map.lock())?;
                disk.store(&self.dev, sector);
                Ok(())
            });

        match result {
            Ok(()) => log::debug!("create inode {sector}: length {length}"),
            Err(err) => log::warn!("create inode {sector}: {err}"),
        }
        result
    }
}

impl Drop for InodeTable {
    fn drop(&mut self) {
        let open_inodes = self.open_inodes.get_mut();
        if !open_inodes.is_empty() {
            log::warn!(
                "unmount with {} inodes still open: {:?}",
                open_inodes.len(),
                open_inodes.iter().map(|inode| inode.inumber()).collect::<Vec<_>>()
            );
        }
    }
}
