//! 根目录，唯一的目录，占一个块，内含定长的目录项数组。

use core::fmt;
use std::io::Cursor;

use binrw::{binrw, BinRead, BinWrite};
use block_dev::BlockDevice;

use crate::config::{BLOCK_SIZE, FILENAME_LEN, FILENAME_MAX_LEN, FILE_MAX_COUNT};
use crate::{BlockId, Error, Result};

/// 磁盘上的目录项，32字节
#[binrw]
#[brw(little)]
#[derive(Debug, Clone)]
struct RawDirEntry {
    /// NUL填充的文件名，首字节为NUL表示空闲项
    name: [u8; FILENAME_LEN],

    /// 文件的字节量
    size: u32,

    /// 首个数据块，空文件为[`BlockId::EOC`]
    #[brw(pad_after = 10)]
    first_block: u16,
}

/// 定长的文件名，长度显式记录，不依赖结尾NUL。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileName {
    bytes: [u8; FILENAME_MAX_LEN],
    len: u8,
}

impl FileName {
    pub fn new(name: &str) -> Result<Self> {
        Self::from_bytes(name.as_bytes())
    }

    pub fn as_str(&self) -> &str {
        // 构造时已保证是完整的UTF-8
        core::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }

    fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::InvalidArgument("empty filename"));
        }
        if raw.len() > FILENAME_MAX_LEN {
            return Err(Error::InvalidArgument("filename is too long"));
        }
        if raw.contains(&0) || core::str::from_utf8(raw).is_err() {
            return Err(Error::InvalidArgument("filename is not valid text"));
        }

        let mut bytes = [0; FILENAME_MAX_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    fn to_raw(self) -> [u8; FILENAME_LEN] {
        let mut raw = [0; FILENAME_LEN];
        raw[..FILENAME_MAX_LEN].copy_from_slice(&self.bytes);
        raw
    }
}

impl fmt::Debug for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 被占用的目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: FileName,
    size: u32,
    first_block: BlockId,
}

impl DirEntry {
    fn new(name: FileName) -> Self {
        Self {
            name,
            size: 0,
            first_block: BlockId::EOC,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// 首个数据块，没有数据块时为[`BlockId::EOC`]
    pub fn first_block(&self) -> BlockId {
        self.first_block
    }

    pub(crate) fn set_first_block(&mut self, id: BlockId) {
        self.first_block = id;
    }

    /// 只增不减，写入永远不会截断文件
    pub(crate) fn grow_to(&mut self, size: usize) {
        self.size = self.size.max(size as u32);
    }
}

impl fmt::Display for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file: {}, size: {}, data_blk: {}",
            self.name, self.size, self.first_block
        )
    }
}

impl RawDirEntry {
    /// 空闲项解析为`None`
    fn parse(self) -> Result<Option<DirEntry>> {
        if self.name[0] == 0 {
            return Ok(None);
        }

        let len = self.name.iter().position(|&b| b == 0).unwrap_or(FILENAME_LEN);
        let name = FileName::from_bytes(&self.name[..len])
            .map_err(|_| Error::InvalidFormat("malformed filename in root directory"))?;
        Ok(Some(DirEntry {
            name,
            size: self.size,
            first_block: BlockId::new(self.first_block),
        }))
    }
}

impl From<Option<&DirEntry>> for RawDirEntry {
    fn from(entry: Option<&DirEntry>) -> Self {
        match entry {
            Some(entry) => Self {
                name: entry.name.to_raw(),
                size: entry.size,
                first_block: entry.first_block.into(),
            },
            None => Self {
                name: [0; FILENAME_LEN],
                size: 0,
                first_block: BlockId::EOC.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDir {
    slots: Vec<Option<DirEntry>>,
}

impl Default for RootDir {
    fn default() -> Self {
        Self {
            slots: vec![None; FILE_MAX_COUNT],
        }
    }
}

impl RootDir {
    pub fn load(dev: &dyn BlockDevice, block_id: usize) -> Result<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        dev.read_block(block_id, &mut buf)?;

        let mut reader = Cursor::new(&buf[..]);
        let slots = (0..FILE_MAX_COUNT)
            .map(|_| {
                RawDirEntry::read(&mut reader)
                    .map_err(|_| Error::InvalidFormat("unreadable root directory"))
                    .and_then(RawDirEntry::parse)
            })
            .collect::<Result<_>>()?;

        Ok(Self { slots })
    }

    pub fn store(&self, dev: &dyn BlockDevice, block_id: usize) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        let mut writer = Cursor::new(&mut buf[..]);
        for slot in &self.slots {
            RawDirEntry::from(slot.as_ref())
                .write(&mut writer)
                .map_err(|_| Error::InvalidFormat("root directory does not fit in a block"))?;
        }
        dev.write_block(block_id, &buf)?;
        Ok(())
    }

    /// 按名字查找，返回目录项下标。
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|entry| entry.name() == name))
    }

    /// 占用编号最小的空闲项，不分配数据块。
    pub fn create(&mut self, name: &str) -> Result<usize> {
        let name = FileName::new(name)?;
        if self.lookup(name.as_str()).is_some() {
            return Err(Error::AlreadyExists);
        }

        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::CatalogFull)?;
        self.slots[index] = Some(DirEntry::new(name));
        Ok(index)
    }

    /// 清空目录项，返回原来的内容。
    pub fn remove(&mut self, index: usize) -> Option<DirEntry> {
        self.slots.get_mut(index)?.take()
    }

    pub fn get(&self, index: usize) -> Option<&DirEntry> {
        self.slots.get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DirEntry> {
        self.slots.get_mut(index)?.as_mut()
    }

    /// 按目录项顺序遍历被占用的项
    pub fn iter(&self) -> impl Iterator<Item = &DirEntry> + '_ {
        self.slots.iter().flatten()
    }

    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }
}
