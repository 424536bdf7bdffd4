use alloc::sync::Arc;

use block_dev::BlockDevice;

use crate::sector::SectorRecord;
use crate::{INDEX_COUNT, SectorId};

/// 索引块：整个扇区连续存储扇区编号。
///
/// 一级索引块的编号指向二级索引块，二级索引块的编号指向数据扇区。
#[derive(Debug, Clone)]
#[repr(C)]
pub struct IndexBlock {
    pub entries: [SectorId; INDEX_COUNT],
}

impl Default for IndexBlock {
    fn default() -> Self {
        Self {
            entries: [SectorId::default(); INDEX_COUNT],
        }
    }
}

unsafe impl SectorRecord for IndexBlock {}

impl IndexBlock {
    /// 从 `root` 出发，按 `path` 逐级取出编号，返回最后一级指向的扇区。
    ///
    /// 每一级都要读一次设备。
    pub fn walk(dev: &Arc<dyn BlockDevice>, root: SectorId, path: &[usize]) -> SectorId {
        path.iter()
            .fold(root, |sector, &slot| Self::load(dev, sector).entries[slot])
    }
}
