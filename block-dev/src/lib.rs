//! # 块设备接口层
//!
//! 块设备是以**块**(扇区)为单位存储数据的设备，例如磁盘、U盘等；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 每次读写都恰好是一个完整的块，本层不暴露部分块的操作。

#![no_std]

use core::any::Any;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    /// 读出编号为 `block_id` 的块，`buf` 的长度须恰为一块
    fn read_block(&self, block_id: usize, buf: &mut [u8]);

    /// 写入编号为 `block_id` 的块，`buf` 的长度须恰为一块
    fn write_block(&self, block_id: usize, buf: &[u8]);

    /// 设备的总块数，合法块编号为 `0..num_blocks()`
    fn num_blocks(&self) -> usize;
}
