
use std::fs::File;
use std::io;
use std::io::{Read, Write};
use std::io::{Seek, SeekFrom};
use std::sync::Mutex;

use block_dev::BlockDevice;
use inode_fs::SECTOR_SIZE;

/// 以宿主机上的文件作为块设备，文件长度须为扇区大小的整数倍
#[derive(Debug)]
pub struct BlockFile {
    file: Mutex<File>,
    blocks: usize,
}

impl BlockFile {
    pub fn new(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len() as usize;
        if len % SECTOR_SIZE != 0 {
            return Err(io::Error::other(format!(
                "image size {len} is not a multiple of {SECTOR_SIZE}"
            )));
        }

        Ok(Self {
            file: Mutex::new(file),
            blocks: len / SECTOR_SIZE,
        })
    }

    /// 创建 `blocks` 个扇区的全零镜像
    pub fn create(file: File, blocks: usize) -> io::Result<Self> {
        file.set_len((blocks * SECTOR_SIZE) as u64)?;
        Self::new(file)
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * SECTOR_SIZE) as u64))
            .expect("seeking error");
        file.read_exact(buf).expect("not a complete block!");
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * SECTOR_SIZE) as u64))
            .expect("seeking error");
        file.write_all(buf).expect("not a complete block!");
    }

    #[inline]
    fn num_blocks(&self) -> usize {
        self.blocks
    }
}
