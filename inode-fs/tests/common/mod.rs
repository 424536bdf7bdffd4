#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use block_dev::BlockDevice;
use inode_fs::{Bitmap, FreeMap, InodeTable, SECTOR_SIZE, SectorId};

/// 放在内存里的块设备，记录读写次数
pub struct RamDisk {
    blocks: Mutex<Vec<[u8; SECTOR_SIZE]>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl RamDisk {
    pub fn new(blocks: usize) -> Self {
        Self {
            blocks: Mutex::new(vec![[0; SECTOR_SIZE]; blocks]),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// 原样取出一个扇区，不计入读次数
    pub fn peek(&self, sector: SectorId) -> [u8; SECTOR_SIZE] {
        self.blocks.lock().unwrap()[sector.block()]
    }

    /// 扇区内第 `index` 个 `u32`(小端)
    pub fn word(&self, sector: SectorId, index: usize) -> u32 {
        let block = self.peek(sector);
        u32::from_le_bytes(block[index * 4..index * 4 + 4].try_into().unwrap())
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        buf.copy_from_slice(&self.blocks.lock().unwrap()[block_id]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.blocks.lock().unwrap()[block_id].copy_from_slice(buf);
    }

    fn num_blocks(&self) -> usize {
        self.blocks.lock().unwrap().len()
    }
}

/// 与测试共享状态的空闲扇区表，可以让第 `fail_after` 次申请之后的申请失败
#[derive(Clone)]
pub struct SharedMap {
    pub bitmap: Arc<Mutex<Bitmap>>,
    pub fail_after: Option<usize>,
    granted: Arc<AtomicUsize>,
}

impl SharedMap {
    pub fn new(sectors: usize) -> Self {
        let mut bitmap = Bitmap::new(sectors);
        // 0号扇区留作引导
        bitmap.reserve(0..1);
        Self {
            bitmap: Arc::new(Mutex::new(bitmap)),
            fail_after: None,
            granted: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unused(&self) -> usize {
        self.bitmap.lock().unwrap().unused()
    }

    pub fn is_used(&self, sector: SectorId) -> bool {
        self.bitmap.lock().unwrap().is_used(sector)
    }
}

impl FreeMap for SharedMap {
    fn allocate(&mut self, count: usize) -> Option<SectorId> {
        if self
            .fail_after
            .is_some_and(|limit| self.granted.load(Ordering::Relaxed) >= limit)
        {
            return None;
        }
        let sector = self.bitmap.lock().unwrap().allocate(count)?;
        self.granted.fetch_add(1, Ordering::Relaxed);
        Some(sector)
    }

    fn release(&mut self, start: SectorId, count: usize) {
        self.bitmap.lock().unwrap().release(start, count)
    }

    fn unused(&self) -> usize {
        self.bitmap.lock().unwrap().unused()
    }
}

pub struct Mounted {
    pub disk: Arc<RamDisk>,
    pub map: SharedMap,
    pub table: InodeTable,
}

pub fn mount(sectors: usize) -> Mounted {
    mount_with(sectors, SharedMap::new(sectors))
}

pub fn mount_with(sectors: usize, map: SharedMap) -> Mounted {
    let disk = Arc::new(RamDisk::new(sectors));
    let dev: Arc<dyn BlockDevice> = disk.clone();
    let table = InodeTable::new(dev, map.clone());
    Mounted { disk, map, table }
}

impl Mounted {
    /// 申请 inode 扇区并创建文件
    pub fn create(&self, length: usize) -> SectorId {
        let sector = self.table.alloc_sector().unwrap();
        self.table.create(sector, length).unwrap();
        sector
    }
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
