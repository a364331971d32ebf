//! 读写引擎：把描述符上的字节区间翻译成簇链上的整块读写。
//!
//! 只覆盖块的一部分时先读出整块，改写对应区间后整块写回，
//! 块内不相关的字节因此得以保留。

use block_dev::BlockDevice;

use crate::config::BLOCK_SIZE;
use crate::file::OpenFile;
use crate::{BlockId, Error, Fd, Result, Volume};

impl<D: BlockDevice> Volume<D> {
    /// 从当前偏移量读取至多`buf.len()`字节，返回实际读取的字节数。
    ///
    /// 到达文件末尾或簇链提前结束时少读，不算错误。
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let OpenFile { entry, offset } = *self.files.get(fd)?;
        let entry = self.entry(entry)?;

        let end = (offset + buf.len()).min(entry.size()); // exclusive
        if offset >= end {
            return Ok(0);
        }

        let chain = self.chain(entry.first_block())?;
        let mut block = [0u8; BLOCK_SIZE];
        let mut pos = offset;
        for &id in chain.iter().skip(offset / BLOCK_SIZE) {
            if pos == end {
                break;
            }
            let in_block = pos % BLOCK_SIZE;
            let len = (BLOCK_SIZE - in_block).min(end - pos);

            log::trace!("fd {fd}: read {len} bytes from data block {id}");
            self.dev.read_block(self.sb.device_block(id), &mut block)?;
            buf[pos - offset..pos - offset + len].copy_from_slice(&block[in_block..in_block + len]);
            pos += len;
        }

        if pos < end {
            log::warn!("fd {fd}: chain ends {} bytes before end of file", end - pos);
        }
        self.files.get_mut(fd)?.offset = pos;

        Ok(pos - offset)
    }

    /// 从当前偏移量写入`buf`，返回实际写入的字节数。
    ///
    /// 簇链不够长时逐块扩展；数据块耗尽时只写入能容纳的部分。
    /// 设备出错时本次新分配的块全部退还，文件大小与偏移量不变。
    pub fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize> {
        let OpenFile { entry: index, offset } = *self.files.get(fd)?;
        if buf.is_empty() {
            return Ok(0);
        }

        let kept = self.chain(self.entry(index)?.first_block())?.len();
        let chain = self.reserve(index, (offset + buf.len()).div_ceil(BLOCK_SIZE))?;
        let end = (offset + buf.len()).min(chain.len() * BLOCK_SIZE); // exclusive
        if offset >= end {
            return Ok(0);
        }

        if let Err(e) = self.write_blocks(fd, &chain, offset, end, buf) {
            self.shrink(index, kept)?;
            return Err(e);
        }

        self.files.get_mut(fd)?.offset = end;
        self.root
            .get_mut(index)
            .ok_or(Error::InvalidDescriptor)?
            .grow_to(end);

        Ok(end - offset)
    }
}

impl<D: BlockDevice> Volume<D> {
    fn chain(&self, first: BlockId) -> Result<Vec<BlockId>> {
        self.fat.chain(first).collect()
    }

    /// 把`buf`写到文件的`offset..end`区间，`chain`须已覆盖该区间。
    fn write_blocks(
        &self,
        fd: Fd,
        chain: &[BlockId],
        offset: usize,
        end: usize,
        buf: &[u8],
    ) -> Result<()> {
        let mut block = [0u8; BLOCK_SIZE];
        let mut pos = offset;
        for &id in chain.iter().skip(offset / BLOCK_SIZE) {
            if pos == end {
                break;
            }
            let in_block = pos % BLOCK_SIZE;
            let len = (BLOCK_SIZE - in_block).min(end - pos);
            let block_id = self.sb.device_block(id);

            log::trace!("fd {fd}: write {len} bytes to data block {id}");
            if len < BLOCK_SIZE {
                self.dev.read_block(block_id, &mut block)?;
            }
            block[in_block..in_block + len].copy_from_slice(&buf[pos - offset..pos - offset + len]);
            self.dev.write_block(block_id, &block)?;
            pos += len;
        }
        Ok(())
    }

    /// 把目录项的簇链截回`len`块。
    fn shrink(&mut self, index: usize, len: usize) -> Result<()> {
        let entry = self.root.get_mut(index).ok_or(Error::InvalidDescriptor)?;
        let first = self.fat.truncate(entry.first_block(), len)?;
        entry.set_first_block(first);
        Ok(())
    }

    /// 让目录项的簇链至少有`blocks`块，返回整条链。
    ///
    /// 空间不足时返回的链可能更短。
    fn reserve(&mut self, index: usize, blocks: usize) -> Result<Vec<BlockId>> {
        let entry = self.root.get_mut(index).ok_or(Error::InvalidDescriptor)?;
        let mut chain: Vec<BlockId> = self.fat.chain(entry.first_block()).collect::<Result<_>>()?;

        while chain.len() < blocks {
            let allocated = match chain.last() {
                Some(&last) => self.fat.append(last),
                None => self.fat.alloc().inspect(|&first| entry.set_first_block(first)),
            };
            match allocated {
                Ok(id) => chain.push(id),
                Err(Error::NoSpace) => {
                    log::debug!(
                        "Volume is full, entry {index} holds {} of {blocks} blocks",
                        chain.len()
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(chain)
    }
}
