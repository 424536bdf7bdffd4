//! # 磁盘数据结构层
//!
//! 每个 inode 记录占一个扇区，其后挂着一棵至多两层的索引树：
//!
//! ```text
//! DiskInode ─┬─ direct[0..124] ──────────────────────────> 数据扇区
//!            └─ indirect ─> 一级索引块 ─> 二级索引块[128] ─> 数据扇区[128]
//! ```
//!
//! 索引块本身不记录自己是第几级，层级完全由它到 `indirect` 的深度决定。

mod index;
mod inode;

pub use self::{
    index::IndexBlock,
    inode::{DiskInode, InodeKind, Position},
};
