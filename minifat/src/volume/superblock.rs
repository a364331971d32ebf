use std::io::Cursor;
use std::ops::Range;

use binrw::{binrw, BinRead, BinWrite};
use block_dev::BlockDevice;

use crate::config::{BLOCK_SIZE, FAT_ENTRIES_PER_BLOCK, MAX_DATA_BLOCKS};
use crate::{BlockId, Error, Result};

/// 超级块所在的块号
pub const SUPERBLOCK_ID: usize = 0;

/// 超级块，位于0号块，描述整个卷的几何布局。
///
/// 挂载时读取一次，此后只读；只有格式化会写它。
#[binrw]
#[brw(little, magic = b"ECS150FS")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    /// 卷的总块数，须与设备一致
    total_blocks: u16,

    /// 根目录所在块
    root_dir: u16,

    /// 数据区的起始块
    data_start: u16,

    /// 数据块的数量
    data_blocks: u16,

    /// FAT占用的块数
    #[brw(pad_after = 4079)]
    fat_blocks: u8,
}

/* 块剩余部分皆填0x00 */

impl Superblock {
    /// 为`total_blocks`块的设备计算布局：
    /// FAT取能覆盖剩余数据块的最小块数。
    pub fn new(total_blocks: usize) -> Result<Self> {
        // 超级块 + FAT + 根目录 + 数据区各至少一块
        if total_blocks < 4 {
            return Err(Error::InvalidArgument("device is too small for a volume"));
        }

        let (fat_blocks, data_blocks) = (1..)
            .map(|fat_blocks| (fat_blocks, total_blocks - 2 - fat_blocks))
            .find(|&(fat_blocks, data_blocks)| data_blocks <= fat_blocks * FAT_ENTRIES_PER_BLOCK)
            .ok_or(Error::InvalidArgument("device is too large for a volume"))?;
        if data_blocks > MAX_DATA_BLOCKS {
            return Err(Error::InvalidArgument("device is too large for a volume"));
        }

        let root_dir = 1 + fat_blocks;
        Ok(Self {
            total_blocks: total_blocks as u16,
            root_dir: root_dir as u16,
            data_start: (root_dir + 1) as u16,
            data_blocks: data_blocks as u16,
            fat_blocks: fat_blocks as u8,
        })
    }

    /// 读出并校验`dev`的超级块。
    pub fn load(dev: &dyn BlockDevice) -> Result<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        dev.read_block(SUPERBLOCK_ID, &mut buf)?;

        let sb = Self::read(&mut Cursor::new(&buf[..])).map_err(|e| {
            log::warn!("Rejected superblock: {e}");
            match e {
                binrw::Error::BadMagic { .. } => Error::InvalidFormat("signature mismatch"),
                _ => Error::InvalidFormat("unreadable superblock"),
            }
        })?;
        sb.validate(dev.block_count())?;

        Ok(sb)
    }

    pub fn store(&self, dev: &dyn BlockDevice) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        self.write(&mut Cursor::new(&mut buf[..]))
            .map_err(|_| Error::InvalidFormat("superblock does not fit in a block"))?;
        dev.write_block(SUPERBLOCK_ID, &buf)?;
        Ok(())
    }

    pub const fn total_blocks(&self) -> usize {
        self.total_blocks as usize
    }

    pub const fn fat_blocks(&self) -> usize {
        self.fat_blocks as usize
    }

    pub const fn root_dir(&self) -> usize {
        self.root_dir as usize
    }

    pub const fn data_start(&self) -> usize {
        self.data_start as usize
    }

    pub const fn data_blocks(&self) -> usize {
        self.data_blocks as usize
    }

    /// FAT所在的块，紧跟超级块
    pub const fn fat_area(&self) -> Range<usize> {
        SUPERBLOCK_ID + 1..SUPERBLOCK_ID + 1 + self.fat_blocks as usize
    }

    /// 数据块在设备上的块号
    pub fn device_block(&self, id: BlockId) -> usize {
        self.data_start() + usize::from(id)
    }
}

impl Superblock {
    fn validate(&self, device_blocks: usize) -> Result<()> {
        let check = |ok: bool, reason: &'static str| {
            if ok {
                Ok(())
            } else {
                log::warn!("Rejected superblock {self:?}: {reason}");
                Err(Error::InvalidFormat(reason))
            }
        };

        check(
            self.total_blocks() == device_blocks,
            "block count differs from the device",
        )?;
        check(
            (1..=MAX_DATA_BLOCKS).contains(&self.data_blocks()),
            "bad data block count",
        )?;
        check(
            self.fat_blocks() * FAT_ENTRIES_PER_BLOCK >= self.data_blocks(),
            "FAT cannot hold every data block",
        )?;
        check(
            self.root_dir() == self.fat_area().end,
            "root directory does not follow the FAT",
        )?;
        check(
            self.data_start() == self.root_dir() + 1,
            "data region does not follow the root directory",
        )?;
        check(
            self.data_start() + self.data_blocks() == self.total_blocks(),
            "data region does not end at the last block",
        )
    }
}
