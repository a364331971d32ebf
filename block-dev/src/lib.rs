//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，例如磁盘镜像、内存盘等；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 驱动只需支持整块读写，文件系统从不对设备做部分块的读写。

mod mem_disk;

use std::io;

use thiserror::Error;

pub use self::mem_disk::MemDisk;

/// 块的字节量，卷上所有区域都以此为单位
pub const BLOCK_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("block {block_id} is out of range, the device has {block_count} blocks")]
    OutOfRange { block_id: usize, block_count: usize },

    #[error("buffer of {0} bytes is not a whole block")]
    BadBufferSize(usize),

    #[error("device I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// 块设备驱动特质
///
/// 打开设备由驱动自己的构造函数负责（按名字打开镜像文件、创建内存盘等），
/// 关闭则通过 [`BlockDevice::close`]。
pub trait BlockDevice: Send + Sync {
    /// 设备的总块数，在设备的生命周期内不变
    fn block_count(&self) -> usize;

    /// `buf.len()`必须等于[`BLOCK_SIZE`]。
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// `buf.len()`必须等于[`BLOCK_SIZE`]。
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError>;

    /// 把尚未落盘的数据写回并释放设备。
    fn close(&self) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// 驱动共用的参数检查
pub fn check_access(block_id: usize, block_count: usize, buf_len: usize) -> Result<(), DeviceError> {
    if block_id >= block_count {
        return Err(DeviceError::OutOfRange {
            block_id,
            block_count,
        });
    }
    if buf_len != BLOCK_SIZE {
        return Err(DeviceError::BadBufferSize(buf_len));
    }
    Ok(())
}
