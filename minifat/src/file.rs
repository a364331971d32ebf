//! 打开文件表
//!
//! 描述符只在一次挂载内有效。同一个文件可以被打开多次，
//! 每个描述符各自维护偏移量。

use derive_more::{Display, From, Into};

use crate::config::OPEN_MAX_COUNT;
use crate::{Error, Result};

/// 文件描述符，即打开文件表的下标
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct Fd(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFile {
    /// 根目录中的目录项下标
    pub entry: usize,
    /// 不超过文件大小
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct OpenFileTable {
    slots: [Option<OpenFile>; OPEN_MAX_COUNT],
}

impl Default for OpenFileTable {
    fn default() -> Self {
        Self {
            slots: [None; OPEN_MAX_COUNT],
        }
    }
}

impl OpenFileTable {
    /// 占用编号最小的空闲描述符，偏移量从0开始。
    pub fn open(&mut self, entry: usize) -> Result<Fd> {
        let fd = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::TooManyOpenFiles)?;
        self.slots[fd] = Some(OpenFile { entry, offset: 0 });
        Ok(Fd(fd))
    }

    pub fn close(&mut self, fd: Fd) -> Result<OpenFile> {
        self.slots
            .get_mut(fd.0)
            .and_then(Option::take)
            .ok_or(Error::InvalidDescriptor)
    }

    pub fn get(&self, fd: Fd) -> Result<&OpenFile> {
        self.slots
            .get(fd.0)
            .and_then(Option::as_ref)
            .ok_or(Error::InvalidDescriptor)
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut OpenFile> {
        self.slots
            .get_mut(fd.0)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidDescriptor)
    }

    /// 是否有描述符指向该目录项
    pub fn is_referenced(&self, entry: usize) -> bool {
        self.slots.iter().flatten().any(|file| file.entry == entry)
    }

    pub fn open_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn free_count(&self) -> usize {
        OPEN_MAX_COUNT - self.open_count()
    }
}
