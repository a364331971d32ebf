use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use block_dev::{check_access, BlockDevice, DeviceError, BLOCK_SIZE};
use send_wrapper::SendWrapper;

/// 以宿主机上的镜像文件充当块设备
#[derive(Debug)]
pub struct BlockFile {
    inner: SendWrapper<RefCell<File>>,
    block_count: usize,
}

impl BlockFile {
    /// 按名字打开已有的镜像，块数由文件大小决定。
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let fd = OpenOptions::new().read(true).write(true).open(path)?;
        let len = fd.metadata()?.len() as usize;
        if len % BLOCK_SIZE != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "image size is not a multiple of the block size",
            ));
        }
        Ok(Self::new(fd, len / BLOCK_SIZE))
    }

    /// 新建（或截断）`block_count`块大小的镜像。
    pub fn create(path: impl AsRef<Path>, block_count: usize) -> io::Result<Self> {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        fd.set_len((block_count * BLOCK_SIZE) as u64)?;
        Ok(Self::new(fd, block_count))
    }

    fn new(fd: File, block_count: usize) -> Self {
        Self {
            inner: SendWrapper::new(RefCell::new(fd)),
            block_count,
        }
    }
}

impl BlockDevice for BlockFile {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        check_access(block_id, self.block_count, buf.len())?;
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        check_access(block_id, self.block_count, buf.len())?;
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn close(&self) -> Result<(), DeviceError> {
        self.inner.borrow().sync_all()?;
        Ok(())
    }
}
