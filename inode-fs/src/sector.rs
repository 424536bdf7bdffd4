//! # 扇区
//!
//! 扇区是设备读写的最小单位。磁盘上的 inode 记录和索引块都恰好占据一个扇区，
//! 通过 [`SectorRecord`] 整块读入或写出。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::{mem, ptr, slice};

use block_dev::BlockDevice;
use derive_more::{Display, From, Into};

use crate::{Error, Result, SECTOR_SIZE};

/// 扇区编号，磁盘上以 `u32` 存储
#[derive(
    Debug, Default, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into,
)]
#[repr(transparent)]
pub struct SectorId(u32);

impl SectorId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// 校验编号落在 `0..limit` 之内
    pub fn checked(raw: usize, limit: usize) -> Result<Self> {
        match u32::try_from(raw) {
            Ok(id) if raw < limit => Ok(Self(id)),
            _ => Err(Error::SectorOutOfRange { sector: raw, limit }),
        }
    }

    /// 交给块设备使用的块编号
    #[inline]
    pub fn block(self) -> usize {
        self.0 as usize
    }
}

/// 恰好占据一个扇区的磁盘结构。
///
/// # Safety
///
/// 实现者必须是 `#[repr(C)]`，大小等于 [`SECTOR_SIZE`]，
/// 且任意字节组合都是它的合法值。
pub unsafe trait SectorRecord: Default + Sized {
    #[inline]
    fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), mem::size_of::<Self>()) }
    }

    #[inline]
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(ptr::from_mut(self).cast(), mem::size_of::<Self>()) }
    }

    fn load(dev: &Arc<dyn BlockDevice>, sector: SectorId) -> Self {
        let mut record = Self::default();
        dev.read_block(sector.block(), record.as_bytes_mut());
        record
    }

    fn store(&self, dev: &Arc<dyn BlockDevice>, sector: SectorId) {
        dev.write_block(sector.block(), self.as_bytes());
    }
}

/// 一个扇区大小的中转缓冲，用于不足一个扇区的读写
pub fn scratch() -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(SECTOR_SIZE)
        .map_err(|_| Error::OutOfMemory)?;
    buf.resize(SECTOR_SIZE, 0);
    Ok(buf)
}
