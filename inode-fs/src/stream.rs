//! 把 `[offset, offset + size)` 拆成逐扇区的片段，读写共用。
//!
//! 片段不会越过扇区边界，也不会越过文件末尾；
//! 偏移到达文件长度时迭代结束，调用者据此得到实际传输的字节数。

use alloc::sync::Arc;
use core::ops::Range;

use block_dev::BlockDevice;

use crate::layout::DiskInode;
use crate::{SECTOR_SIZE, SectorId};

#[derive(Debug, PartialEq, Eq)]
pub struct Chunk {
    pub sector: SectorId,
    /// 扇区内偏移
    pub sector_offset: usize,
    pub len: usize,
}

pub struct Chunks<'a> {
    disk: &'a DiskInode,
    dev: &'a Arc<dyn BlockDevice>,
    offset: usize,
    remaining: usize,
}

impl Chunk {
    /// 恰好覆盖整个扇区，可以直接与调用者的缓冲交换数据
    #[inline]
    pub fn is_whole(&self) -> bool {
        self.sector_offset == 0 && self.len == SECTOR_SIZE
    }

    /// 扇区内除本片段外还有别的字节
    #[inline]
    pub fn is_partial(&self) -> bool {
        self.sector_offset > 0 || self.len < SECTOR_SIZE - self.sector_offset
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.sector_offset..self.sector_offset + self.len
    }
}

impl<'a> Chunks<'a> {
    pub fn new(
        disk: &'a DiskInode,
        dev: &'a Arc<dyn BlockDevice>,
        offset: usize,
        size: usize,
    ) -> Self {
        Self {
            disk,
            dev,
            offset,
            remaining: size,
        }
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.remaining == 0 {
            return None;
        }

        // 偏移不小于文件长度时没有对应扇区，传输到此为止
        let sector = self.disk.resolve(self.offset, self.dev)?;
        let sector_offset = self.offset % SECTOR_SIZE;

        let inode_left = self.disk.len() - self.offset;
        let sector_left = SECTOR_SIZE - sector_offset;
        let len = self.remaining.min(inode_left).min(sector_left);

        self.offset += len;
        self.remaining -= len;

        Some(Chunk {
            sector,
            sector_offset,
            len,
        })
    }
}
