use spin::Mutex;

use crate::{check_access, BlockDevice, DeviceError, BLOCK_SIZE};

/// 内存盘，数据全部放在堆上，进程退出即丢失。
#[derive(Debug)]
pub struct MemDisk {
    data: Mutex<Vec<u8>>,
    block_count: usize,
}

impl MemDisk {
    pub fn new(block_count: usize) -> Self {
        Self {
            data: Mutex::new(vec![0; block_count * BLOCK_SIZE]),
            block_count,
        }
    }

    /// 整盘内容的拷贝
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().clone()
    }
}

impl BlockDevice for MemDisk {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        check_access(block_id, self.block_count, buf.len())?;
        let start = block_id * BLOCK_SIZE;
        buf.copy_from_slice(&self.data.lock()[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        check_access(block_id, self.block_count, buf.len())?;
        let start = block_id * BLOCK_SIZE;
        self.data.lock()[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }
}
