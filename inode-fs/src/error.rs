use derive_more::Display;

use crate::SectorId;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 所需扇区(含索引块)超出单个 inode 的上限
    #[display(fmt = "file needs {} sectors, more than an inode can address", required)]
    TooLarge { required: usize },
    /// 空闲扇区不足
    #[display(fmt = "need {} free sectors, only {} left", required, unused)]
    NoSpace { required: usize, unused: usize },
    /// 无法为句柄或缓冲申请内存
    #[display(fmt = "out of memory")]
    OutOfMemory,
    #[display(fmt = "sector {} is outside the device ({} sectors)", sector, limit)]
    SectorOutOfRange { sector: usize, limit: usize },
    /// 扇区上不是合法的 inode 记录
    #[display(fmt = "sector {} holds no inode (magic {:#x})", sector, magic)]
    BadMagic { sector: SectorId, magic: u32 },
}
