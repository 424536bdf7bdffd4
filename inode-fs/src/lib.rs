#![no_std]

extern crate alloc;

/* inode 层的整体架构，自上而下 */

// 打开表：同一扇区上的 inode 在内存中只有一个句柄
mod table;

// 句柄层：按字节读写、写保护计数
mod inode;

// 把字节区间拆成逐扇区的片段
mod stream;

// 扇区分配驱动：创建时建立索引树，删除时按同样顺序释放
mod alloc_tree;

// 空闲扇区管理
mod free_map;

// 磁盘数据结构层：inode 与索引块
mod layout;

// 扇区编号与扇区缓冲
mod sector;

mod error;

pub use self::{
    error::{Error, Result},
    free_map::{Bitmap, FreeMap},
    inode::{Inode, OpenInode, Stat, StatKind},
    layout::{DiskInode, IndexBlock, InodeKind, Position},
    sector::SectorId,
    table::InodeTable,
};

/// 扇区大小(字节)
pub const SECTOR_SIZE: usize = 512;
/// inode 内直接索引的个数
pub const DIRECT_COUNT: usize = 124;
/// 一个索引块可容纳的扇区编号个数
pub const INDEX_COUNT: usize = SECTOR_SIZE / 4;
/// 创建一个 inode 时最多可申请的扇区数：1 + 124 + 128 + 128 * 128
pub const MAX_ALLOCATION_UNITS: usize = 16637;
/// 合法 inode 记录的魔数
pub const INODE_MAGIC: u32 = 0x494e_4f44;
