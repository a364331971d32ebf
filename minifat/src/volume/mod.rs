//! 卷的布局
//!
//! 超级块 | FAT区 | 根目录 | 数据区
//!
//! 块大小固定为4096字节，所有整数均为小端序。

pub mod fat;
pub mod root_dir;
pub mod superblock;

pub use self::{
    fat::{Chain, Fat},
    root_dir::{DirEntry, FileName, RootDir},
    superblock::Superblock,
};
