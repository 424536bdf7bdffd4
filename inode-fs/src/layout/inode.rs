//! 磁盘上的 inode 记录与块索引编码
//!
//! ## 块索引编码
//!
//! - 块索引小于 [`DIRECT_COUNT`] 时直接取 `direct`
//! - 否则剔去直接索引部分，除以 [`INDEX_COUNT`] 得一级索引块内的槽位，
//!   取模得二级索引块内的槽位

use alloc::sync::Arc;

use block_dev::BlockDevice;

use crate::sector::SectorRecord;
use crate::{DIRECT_COUNT, INDEX_COUNT, INODE_MAGIC, SECTOR_SIZE, SectorId};
use crate::IndexBlock;

/// 间接索引的层数
const INDIRECT_DEPTH: usize = 2;
/// 经由间接索引可编号的数据扇区数
const INDIRECT_CAP: usize = INDEX_COUNT.pow(INDIRECT_DEPTH as u32);

#[derive(Debug, Clone)]
#[repr(C)]
pub struct DiskInode {
    /// 直接索引，依次指向文件前 124 个数据扇区
    pub(crate) direct: [SectorId; DIRECT_COUNT],
    /// 指向一级索引块，仅当文件超过 124 个扇区时有意义
    pub(crate) indirect: SectorId,
    is_directory: u8,
    _padding: [u8; 3],
    // 不用usize是为了严控布局
    length: u32,
    magic: u32,
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum InodeKind {
    #[default]
    File,
    Directory,
}

/// 逻辑块在索引树中的位置
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Position {
    Direct(usize),
    /// 自一级索引块起逐级的槽位
    Indirect([usize; INDIRECT_DEPTH]),
}

impl Default for DiskInode {
    fn default() -> Self {
        Self {
            direct: [SectorId::default(); DIRECT_COUNT],
            indirect: SectorId::default(),
            is_directory: 0,
            _padding: [0; 3],
            length: 0,
            magic: 0,
        }
    }
}

unsafe impl SectorRecord for DiskInode {}

impl DiskInode {
    #[inline]
    pub fn new(length: u32, kind: InodeKind) -> Self {
        Self {
            is_directory: (kind == InodeKind::Directory).into(),
            length,
            magic: INODE_MAGIC,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == INODE_MAGIC
    }

    #[inline]
    pub fn magic(&self) -> u32 {
        self.magic
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn kind(&self) -> InodeKind {
        if self.is_directory != 0 {
            InodeKind::Directory
        } else {
            InodeKind::File
        }
    }

    #[inline]
    pub fn indirect(&self) -> SectorId {
        self.indirect
    }

    /// 返回字节偏移 `offset` 所在的数据扇区；偏移不小于文件长度时返回空。
    ///
    /// 间接索引要多读两次设备，索引块不做缓存。
    pub fn resolve(&self, offset: usize, dev: &Arc<dyn BlockDevice>) -> Option<SectorId> {
        if offset >= self.len() {
            return None;
        }

        match Position::of(offset / SECTOR_SIZE)? {
            Position::Direct(index) => Some(self.direct[index]),
            Position::Indirect(path) => Some(IndexBlock::walk(dev, self.indirect, &path)),
        }
    }

    /// 容纳 `length` 字节需要多少个**数据扇区**
    #[inline]
    pub fn sectors_required(length: usize) -> usize {
        length.div_ceil(SECTOR_SIZE)
    }

    /// `data_sectors` 个数据扇区连同索引块一共要占多少扇区，不含 inode 自身
    pub fn total_allocation_units(data_sectors: usize) -> usize {
        if data_sectors <= DIRECT_COUNT {
            return data_sectors;
        }

        // 一个一级索引块，外加每 128 个数据扇区一个二级索引块
        let indirect_sectors = data_sectors - DIRECT_COUNT;
        data_sectors + indirect_sectors.div_ceil(INDEX_COUNT) + 1
    }
}

impl Position {
    /// 逻辑块索引在索引树中的位置，超出可编号范围时返回空
    pub fn of(block_index: usize) -> Option<Self> {
        if block_index < DIRECT_COUNT {
            return Some(Self::Direct(block_index));
        }

        let index = block_index - DIRECT_COUNT;
        (index < INDIRECT_CAP).then_some(Self::Indirect([index / INDEX_COUNT, index % INDEX_COUNT]))
    }
}
