use core::fmt;

use crate::config::FILE_MAX_COUNT;

/// 卷的几何布局与空闲统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeInfo {
    pub total_blocks: usize,
    pub fat_blocks: usize,
    pub root_dir_block: usize,
    pub data_start: usize,
    pub data_blocks: usize,
    pub free_data_blocks: usize,
    pub free_dir_entries: usize,
}

impl fmt::Display for VolumeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FS Info:")?;
        writeln!(f, "total_blk_count={}", self.total_blocks)?;
        writeln!(f, "fat_blk_count={}", self.fat_blocks)?;
        writeln!(f, "rdir_blk={}", self.root_dir_block)?;
        writeln!(f, "data_blk={}", self.data_start)?;
        writeln!(f, "data_blk_count={}", self.data_blocks)?;
        writeln!(
            f,
            "fat_free_ratio={}/{}",
            self.free_data_blocks, self.data_blocks
        )?;
        write!(
            f,
            "rdir_free_ratio={}/{}",
            self.free_dir_entries, FILE_MAX_COUNT
        )
    }
}
