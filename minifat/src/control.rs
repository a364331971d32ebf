use core::fmt;

use block_dev::BlockDevice;
use thiserror::Error;

use crate::file::{OpenFile, OpenFileTable};
use crate::volume::{DirEntry, Fat, RootDir, Superblock};
use crate::{Error, Fd, Result, VolumeInfo};

/// 已挂载的卷，独占块设备以及全部内存中的元数据。
///
/// FAT与根目录只在内存中修改，直到[`Volume::unmount`]才写回设备。
pub struct Volume<D: BlockDevice> {
    pub(crate) dev: D,
    pub(crate) sb: Superblock,
    pub(crate) fat: Fat,
    pub(crate) root: RootDir,
    pub(crate) files: OpenFileTable,
}

impl<D: BlockDevice> fmt::Debug for Volume<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Volume")
            .field("sb", &self.sb)
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}

impl<D: BlockDevice> Volume<D> {
    /// 在整个设备上建立空卷并挂载。数据区不会被清零。
    pub fn format(dev: D) -> Result<Self> {
        let sb = Superblock::new(dev.block_count())?;
        let fat = Fat::new(sb.data_blocks());
        let root = RootDir::default();

        sb.store(&dev)?;
        fat.store(&dev, &sb)?;
        root.store(&dev, sb.root_dir())?;
        log::info!(
            "Formatted volume: {} blocks, {} of them for data",
            sb.total_blocks(),
            sb.data_blocks()
        );

        Self::mount(dev)
    }

    pub fn mount(dev: D) -> Result<Self> {
        let sb = Superblock::load(&dev)?;
        let fat = Fat::load(&dev, &sb)?;
        let root = RootDir::load(&dev, sb.root_dir())?;
        log::info!(
            "Mounted volume: {} data blocks, {} free",
            sb.data_blocks(),
            fat.free_count()
        );

        Ok(Self {
            dev,
            sb,
            fat,
            root,
            files: OpenFileTable::default(),
        })
    }

    /// 写回FAT与根目录，关闭并交还设备。
    ///
    /// 失败时卷保持挂载，可从[`UnmountError`]中取回。
    pub fn unmount(self) -> core::result::Result<D, UnmountError<D>> {
        if self.files.open_count() > 0 {
            return Err(UnmountError::new(self, Error::FilesStillOpen));
        }
        if let Err(error) = self.flush() {
            return Err(UnmountError::new(self, error));
        }

        log::info!("Unmounted volume");
        Ok(self.dev)
    }

    pub fn info(&self) -> VolumeInfo {
        VolumeInfo {
            total_blocks: self.sb.total_blocks(),
            fat_blocks: self.sb.fat_blocks(),
            root_dir_block: self.sb.root_dir(),
            data_start: self.sb.data_start(),
            data_blocks: self.sb.data_blocks(),
            free_data_blocks: self.fat.free_count(),
            free_dir_entries: self.root.free_count(),
        }
    }

    /// 创建空文件，数据块推迟到第一次写入时再分配。
    pub fn create(&mut self, name: &str) -> Result<()> {
        let index = self.root.create(name)?;
        log::debug!("Created {name:?} at entry {index}");
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        let index = self.root.lookup(name).ok_or(Error::NotFound)?;
        if self.files.is_referenced(index) {
            return Err(Error::FileBusy);
        }

        let first = self.entry(index)?.first_block();
        self.fat.release(first)?;
        self.root.remove(index);
        log::debug!("Deleted {name:?} from entry {index}");

        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&DirEntry> {
        self.root.get(self.root.lookup(name)?)
    }

    /// 按目录项顺序列出全部文件，每次调用都从头开始。
    pub fn list(&self) -> impl Iterator<Item = &DirEntry> + '_ {
        self.root.iter()
    }

    pub fn open(&mut self, name: &str) -> Result<Fd> {
        let index = self.root.lookup(name).ok_or(Error::NotFound)?;
        let fd = self.files.open(index)?;
        log::debug!("Opened {name:?} as fd {fd}");
        Ok(fd)
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.files.close(fd)?;
        log::debug!("Closed fd {fd}");
        Ok(())
    }

    /// 文件的字节量
    pub fn stat(&self, fd: Fd) -> Result<usize> {
        let OpenFile { entry, .. } = *self.files.get(fd)?;
        Ok(self.entry(entry)?.size())
    }

    /// 只能在文件范围内移动，不会扩展文件。
    pub fn seek(&mut self, fd: Fd, offset: usize) -> Result<()> {
        let size = self.stat(fd)?;
        if offset > size {
            return Err(Error::OffsetOutOfRange);
        }
        self.files.get_mut(fd)?.offset = offset;
        Ok(())
    }

    pub fn tell(&self, fd: Fd) -> Result<usize> {
        Ok(self.files.get(fd)?.offset)
    }

    pub fn open_count(&self) -> usize {
        self.files.open_count()
    }

    /// 还能再打开的描述符数量
    pub fn free_descriptors(&self) -> usize {
        self.files.free_count()
    }

    pub fn device(&self) -> &D {
        &self.dev
    }
}

impl<D: BlockDevice> Volume<D> {
    /// 描述符存在期间目录项不可能被删除
    pub(crate) fn entry(&self, index: usize) -> Result<&DirEntry> {
        self.root.get(index).ok_or(Error::InvalidDescriptor)
    }

    fn flush(&self) -> Result<()> {
        self.fat.store(&self.dev, &self.sb)?;
        self.root.store(&self.dev, self.sb.root_dir())?;
        self.dev.close()?;
        Ok(())
    }
}

/// 卸载失败，卷仍然处于挂载状态。
#[derive(Error)]
#[error("cannot unmount")]
pub struct UnmountError<D: BlockDevice> {
    volume: Volume<D>,
    #[source]
    error: Error,
}

impl<D: BlockDevice> UnmountError<D> {
    fn new(volume: Volume<D>, error: Error) -> Self {
        Self { volume, error }
    }

    pub fn error(&self) -> &Error {
        &self.error
    }

    pub fn into_volume(self) -> Volume<D> {
        self.volume
    }

    pub fn into_parts(self) -> (Volume<D>, Error) {
        (self.volume, self.error)
    }
}

impl<D: BlockDevice> fmt::Debug for UnmountError<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnmountError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
