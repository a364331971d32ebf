//! 文件分配表，整表常驻内存，卸载时写回。
//!
//! 每个数据块对应一个16位条目：`0`表示空闲，[`BlockId::EOC`]表示链表结尾，
//! 其余值是同一文件下一块的编号。0号条目保留，恒为[`BlockId::EOC`]。

use block_dev::BlockDevice;

use crate::config::{BLOCK_SIZE, FAT_ENTRIES_PER_BLOCK};
use crate::volume::Superblock;
use crate::{BlockId, Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fat {
    entries: Vec<BlockId>,
}

impl Fat {
    /// 刚格式化的表：除保留条目外全部空闲
    pub fn new(data_blocks: usize) -> Self {
        let mut entries = vec![BlockId::FREE; data_blocks];
        entries[0] = BlockId::EOC;
        Self { entries }
    }

    /// 从FAT区读入整张表。
    pub fn load(dev: &dyn BlockDevice, sb: &Superblock) -> Result<Self> {
        let mut entries = Vec::with_capacity(sb.fat_blocks() * FAT_ENTRIES_PER_BLOCK);
        let mut buf = [0u8; BLOCK_SIZE];
        for block_id in sb.fat_area() {
            dev.read_block(block_id, &mut buf)?;
            entries.extend(
                buf.chunks_exact(2)
                    .map(|raw| BlockId::new(u16::from_le_bytes([raw[0], raw[1]]))),
            );
        }
        entries.truncate(sb.data_blocks());

        let fat = Self { entries };
        if let Some(bad) = fat
            .entries
            .iter()
            .position(|&next| !next.is_eoc() && usize::from(next) >= fat.len())
        {
            log::warn!("FAT entry {bad} links outside the data region");
            return Err(Error::InvalidFormat("FAT entry out of range"));
        }

        Ok(fat)
    }

    /// 整表写回FAT区，末块多余的部分填0。
    pub fn store(&self, dev: &dyn BlockDevice, sb: &Superblock) -> Result<()> {
        let mut chunks = self.entries.chunks(FAT_ENTRIES_PER_BLOCK);
        for block_id in sb.fat_area() {
            let mut buf = [0u8; BLOCK_SIZE];
            for (raw, &id) in buf
                .chunks_exact_mut(2)
                .zip(chunks.next().unwrap_or_default())
            {
                raw.copy_from_slice(&u16::from(id).to_le_bytes());
            }
            dev.write_block(block_id, &buf)?;
        }
        Ok(())
    }

    /// 数据块总数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn free_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|&&id| id == BlockId::FREE)
            .count()
    }

    /// 获取下一个块号。
    /// `Ok(None)`表示`id`为链表上最后一块。
    pub fn next(&self, id: BlockId) -> Result<Option<BlockId>> {
        let raw = usize::from(id);
        if id < BlockId::MIN || raw >= self.len() {
            log::warn!("Chain link {id} is outside the data region");
            return Err(Error::InvalidFormat("chain link out of range"));
        }

        match self.entries[raw] {
            BlockId::FREE => {
                log::warn!("Chain runs into free block {id}");
                Err(Error::InvalidFormat("chain runs into a free block"))
            }
            next => Ok(next.as_option()),
        }
    }

    /// 从`first`开始的簇链，`first`为[`BlockId::EOC`]时为空。
    pub fn chain(&self, first: BlockId) -> Chain<'_> {
        Chain {
            fat: self,
            next: first.as_option(),
            hops: 0,
        }
    }

    /// 寻找编号最小的空闲块。
    pub fn find_free(&self) -> Result<BlockId> {
        self.entries
            .iter()
            .skip(BlockId::MIN.into())
            .position(|&id| id == BlockId::FREE)
            .map(|idx| BlockId::from_index(idx + usize::from(BlockId::MIN)))
            .ok_or(Error::NoSpace)
    }

    /// 分配一个块并将其作为新链表的结尾。
    pub fn alloc(&mut self) -> Result<BlockId> {
        let id = self.find_free()?;
        self.set(id, BlockId::EOC);
        log::debug!("Allocated data block {id}");
        Ok(id)
    }

    /// 在链表末尾追加一个新块，返回新块。
    pub fn extend(&mut self, first: BlockId) -> Result<BlockId> {
        let last = self.last(first)?.ok_or(Error::InvalidArgument("empty chain"))?;
        self.append(last)
    }

    /// 已知链表结尾时的[`Fat::extend`]，省去一次遍历。
    pub fn append(&mut self, last: BlockId) -> Result<BlockId> {
        debug_assert_eq!(Ok(None), self.next(last).map_err(|_| ()));
        let new = self.alloc()?;
        self.set(last, new);
        Ok(new)
    }

    /// 释放整条链表，包括结尾块。
    pub fn release(&mut self, first: BlockId) -> Result<()> {
        let blocks = self.chain(first).collect::<Result<Vec<_>>>()?;
        log::debug!("Releasing {} blocks from {first}", blocks.len());
        for id in blocks {
            self.set(id, BlockId::FREE);
        }
        Ok(())
    }

    /// 只保留链表的前`len`块，其余释放。返回新的首块，`len`为0时为[`BlockId::EOC`]。
    pub fn truncate(&mut self, first: BlockId, len: usize) -> Result<BlockId> {
        let blocks = self.chain(first).collect::<Result<Vec<_>>>()?;
        if blocks.len() <= len {
            return Ok(first);
        }

        log::debug!("Truncating chain {first} from {} to {len} blocks", blocks.len());
        for &id in &blocks[len..] {
            self.set(id, BlockId::FREE);
        }
        match len.checked_sub(1) {
            Some(last) => {
                self.set(blocks[last], BlockId::EOC);
                Ok(first)
            }
            None => Ok(BlockId::EOC),
        }
    }

    /// 链表的最后一块
    pub fn last(&self, first: BlockId) -> Result<Option<BlockId>> {
        self.chain(first).try_fold(None, |_, id| id.map(Some))
    }
}

impl Fat {
    fn set(&mut self, id: BlockId, next: BlockId) {
        self.entries[usize::from(id)] = next;
    }
}

/// 沿FAT走一条链表，最多走数据块总数步，超出即视为成环。
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    fat: &'a Fat,
    next: Option<BlockId>,
    hops: usize,
}

impl Iterator for Chain<'_> {
    type Item = Result<BlockId>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        if self.hops == self.fat.len() {
            log::warn!("Chain exceeds {} blocks, the FAT has a cycle", self.fat.len());
            return Some(Err(Error::InvalidFormat("cyclic chain")));
        }
        self.hops += 1;

        match self.fat.next(id) {
            Ok(next) => {
                self.next = next;
                Some(Ok(id))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
