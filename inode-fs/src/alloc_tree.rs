//! # 扇区分配驱动
//!
//! 唯一会改变索引树形状的地方。创建时按
//! 直接索引 → 一级索引块 → 逐个二级索引块(连同其数据扇区)
//! 的顺序申请扇区，释放时沿同样的顺序归还。

use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;

use crate::layout::{DiskInode, IndexBlock};
use crate::sector::SectorRecord;
use crate::{
    DIRECT_COUNT, Error, FreeMap, INDEX_COUNT, MAX_ALLOCATION_UNITS, Result, SECTOR_SIZE, SectorId,
};

/// 记下本次已申请到的扇区，失败时可以全部归还
struct Claim<'a> {
    free_map: &'a mut dyn FreeMap,
    claimed: Vec<SectorId>,
}

impl<'a> Claim<'a> {
    fn new(free_map: &'a mut dyn FreeMap, capacity: usize) -> Result<Self> {
        let mut claimed = Vec::new();
        claimed
            .try_reserve_exact(capacity)
            .map_err(|_| Error::OutOfMemory)?;
        Ok(Self { free_map, claimed })
    }

    fn next(&mut self) -> Result<SectorId> {
        let sector = self
            .free_map
            .allocate(1)
            .ok_or_else(|| Error::NoSpace {
                required: 1,
                unused: self.free_map.unused(),
            })?;
        log::trace!("claim sector {sector}");
        self.claimed.push(sector);
        Ok(sector)
    }

    fn rollback(self) {
        let Self { free_map, claimed } = self;
        log::warn!("roll back {} claimed sectors", claimed.len());
        for &sector in claimed.iter().rev() {
            free_map.release(sector, 1);
        }
    }
}

/// 为 `disk` 的长度建立完整的索引树并填好 `disk` 的索引字段。
///
/// 数据扇区在申请后清零。失败时已申请的扇区全部归还，`disk` 不应再被写到磁盘上。
pub fn create_allocation(
    disk: &mut DiskInode,
    dev: &Arc<dyn BlockDevice>,
    free_map: &mut dyn FreeMap,
) -> Result<()> {
    let data_sectors = DiskInode::sectors_required(disk.len());
    let required = DiskInode::total_allocation_units(data_sectors);
    if required > MAX_ALLOCATION_UNITS {
        return Err(Error::TooLarge { required });
    }

    // 多出的一个留给 inode 自身
    let unused = free_map.unused();
    if unused < required + 1 {
        return Err(Error::NoSpace {
            required: required + 1,
            unused,
        });
    }

    let mut claim = Claim::new(free_map, required)?;
    match build_tree(disk, data_sectors, dev, &mut claim) {
        Ok(()) => {
            debug_assert_eq!(required, claim.claimed.len());
            Ok(())
        }
        Err(err) => {
            claim.rollback();
            Err(err)
        }
    }
}

fn build_tree(
    disk: &mut DiskInode,
    data_sectors: usize,
    dev: &Arc<dyn BlockDevice>,
    claim: &mut Claim<'_>,
) -> Result<()> {
    let zeros = [0u8; SECTOR_SIZE];

    /******************** 直接索引 ********************/
    let direct = data_sectors.min(DIRECT_COUNT);
    for slot in &mut disk.direct[..direct] {
        *slot = claim.next()?;
        dev.write_block(slot.block(), &zeros);
    }
    /******************** END ********************/

    let mut remaining = data_sectors - direct;
    if remaining == 0 {
        return Ok(());
    }

    /******************** 间接索引 ********************/
    disk.indirect = claim.next()?;

    let mut first = IndexBlock::default();
    for entry in first.entries.iter_mut() {
        if remaining == 0 {
            break;
        }

        *entry = claim.next()?;

        let mut second = IndexBlock::default();
        let count = remaining.min(INDEX_COUNT);
        for slot in &mut second.entries[..count] {
            *slot = claim.next()?;
            dev.write_block(slot.block(), &zeros);
        }
        second.store(dev, *entry);
        remaining -= count;
    }
    debug_assert_eq!(0, remaining);

    // 一级索引块最后写，此时它的每一项都已确定
    first.store(dev, disk.indirect);
    /******************** END ********************/

    Ok(())
}

/// 归还 `disk` 占据的全部扇区，最后是 inode 所在的 `sector`。返回归还的扇区数。
pub fn release_allocation(
    disk: &DiskInode,
    sector: SectorId,
    dev: &Arc<dyn BlockDevice>,
    free_map: &mut dyn FreeMap,
) -> usize {
    let data_sectors = DiskInode::sectors_required(disk.len());
    let mut released = 0;

    /******************** 直接索引 ********************/
    let direct = data_sectors.min(DIRECT_COUNT);
    for &data in &disk.direct[..direct] {
        free_map.release(data, 1);
    }
    released += direct;
    /******************** END ********************/

    /******************** 间接索引 ********************/
    let mut remaining = data_sectors - direct;
    if remaining > 0 {
        let first = IndexBlock::load(dev, disk.indirect);
        for &entry in first.entries.iter() {
            if remaining == 0 {
                break;
            }

            let second = IndexBlock::load(dev, entry);
            let count = remaining.min(INDEX_COUNT);
            for &data in &second.entries[..count] {
                free_map.release(data, 1);
            }
            free_map.release(entry, 1);
            released += count + 1;
            remaining -= count;
        }

        free_map.release(disk.indirect, 1);
        released += 1;
    }
    /******************** END ********************/

    free_map.release(sector, 1);
    released + 1
}
