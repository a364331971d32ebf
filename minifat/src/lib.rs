//! minifat：块设备上的单卷FAT文件系统，整体运行在用户态。
//!
//! 卷只有一个定长的根目录，没有子目录。挂载时FAT与根目录整体读入内存，
//! 之后所有操作只修改内存中的副本，卸载时统一写回。

/* minifat 的整体架构，自下而上 */

// 编译期常量
pub mod config;

// 磁盘数据结构层：超级块、FAT、根目录
pub mod volume;

// 打开文件表
mod file;

// 卷的挂载、卸载与目录操作
mod control;

// 读写引擎
mod io;

mod block;
mod error;
mod info;

pub use block_dev::{BlockDevice, DeviceError};

pub use self::{
    block::BlockId,
    control::{UnmountError, Volume},
    error::{Error, Result},
    file::Fd,
    info::VolumeInfo,
    volume::DirEntry,
};
