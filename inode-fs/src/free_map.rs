//! # 空闲扇区管理
//!
//! inode 层只通过 [`FreeMap`] 申请与归还扇区，具体的记账方式由使用者决定。
//! [`Bitmap`] 是一个放在内存里的实现，总是先给出编号最小的空闲扇区，
//! 因此同样的操作序列总会得到同样的磁盘布局。

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use crate::SectorId;

pub trait FreeMap: Send {
    /// 申请连续的 `count` 个扇区，返回首个扇区的编号
    fn allocate(&mut self, count: usize) -> Option<SectorId>;

    /// 归还自 `start` 起连续的 `count` 个扇区
    fn release(&mut self, start: SectorId, count: usize);

    /// 剩余的空闲扇区数
    fn unused(&self) -> usize;
}

/// 位组
type BitGroup = u64;
const GROUP_BITS: usize = BitGroup::BITS as usize;

/// 每个扇区对应一位，置位表示已占用
#[derive(Debug, Clone)]
pub struct Bitmap {
    groups: Vec<BitGroup>,
    /// 管理的扇区总数
    total: usize,
    used: usize,
}

impl Bitmap {
    pub fn new(total: usize) -> Self {
        let mut groups = vec![0; total.div_ceil(GROUP_BITS)];

        // 末组多出来的位永远不可分配
        let tail = total % GROUP_BITS;
        if let Some(last) = groups.last_mut().filter(|_| tail != 0) {
            *last = !((1 << tail) - 1);
        }

        Self {
            groups,
            total,
            used: 0,
        }
    }

    /// 把 `sectors` 标记为已占用，例如引导扇区
    pub fn reserve(&mut self, sectors: Range<usize>) {
        for bit in sectors.start..sectors.end.min(self.total) {
            if !self.test(bit) {
                self.set(bit);
                self.used += 1;
            }
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn is_used(&self, sector: SectorId) -> bool {
        let bit = sector.block();
        bit < self.total && self.test(bit)
    }
}

impl FreeMap for Bitmap {
    fn allocate(&mut self, count: usize) -> Option<SectorId> {
        if count == 0 || count > self.unused() {
            return None;
        }

        let start = if count == 1 {
            // 寻找还有0的位组
            self.groups
                .iter()
                .enumerate()
                .find_map(|(group_index, &bits)| {
                    (bits != BitGroup::MAX).then_some(encode(group_index, bits.trailing_ones()))
                })?
        } else {
            let mut run = 0;
            let last = (0..self.total).find(|&bit| {
                run = if self.test(bit) { 0 } else { run + 1 };
                run == count
            })?;
            last + 1 - count
        };

        for bit in start..start + count {
            self.set(bit);
        }
        self.used += count;

        Some(SectorId::new(start as u32))
    }

    fn release(&mut self, start: SectorId, count: usize) {
        let start = start.block();
        assert!(start + count <= self.total);

        for bit in start..start + count {
            // 编号一定得有对应的位
            assert!(self.test(bit), "releasing free sector {bit}");
            let (group_index, ingroup_index) = decode(bit);
            self.groups[group_index] &= !(1 << ingroup_index);
        }
        self.used -= count;
    }

    #[inline]
    fn unused(&self) -> usize {
        self.total - self.used
    }
}

impl Bitmap {
    #[inline]
    fn test(&self, bit: usize) -> bool {
        let (group_index, ingroup_index) = decode(bit);
        self.groups[group_index] & (1 << ingroup_index) != 0
    }

    #[inline]
    fn set(&mut self, bit: usize) {
        let (group_index, ingroup_index) = decode(bit);
        self.groups[group_index] |= 1 << ingroup_index;
    }
}

#[inline]
fn encode(group_index: usize, ingroup_index: u32) -> usize {
    group_index * GROUP_BITS + ingroup_index as usize
}

#[inline]
fn decode(bit: usize) -> (usize, usize) {
    (bit / GROUP_BITS, bit % GROUP_BITS)
}
