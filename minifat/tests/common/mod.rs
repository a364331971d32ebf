#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use block_dev::{BlockDevice, DeviceError, MemDisk};
use minifat::Volume;

/// 可以按需让读写失败的内存盘
#[derive(Debug)]
pub struct FaultyDisk {
    inner: MemDisk,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FaultyDisk {
    pub fn new(block_count: usize) -> Self {
        Self {
            inner: MemDisk::new(block_count),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    fn broken() -> DeviceError {
        io::Error::new(io::ErrorKind::Other, "injected fault").into()
    }
}

impl BlockDevice for FaultyDisk {
    fn block_count(&self) -> usize {
        self.inner.block_count()
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(Self::broken());
        }
        self.inner.read_block(block_id, buf)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Self::broken());
        }
        self.inner.write_block(block_id, buf)
    }
}

/// 格式化一块`block_count`块的内存盘并挂载
pub fn fresh_volume(block_count: usize) -> Volume<MemDisk> {
    Volume::format(MemDisk::new(block_count)).unwrap()
}

/// 周期为251的字节序列，与块大小互质，错位读写一定会被发现
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8 ^ seed).collect()
}
