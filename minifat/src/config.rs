//! Constants used in minifat

pub use block_dev::BLOCK_SIZE;

/// 超级块开头的签名
pub const SIGNATURE: [u8; 8] = *b"ECS150FS";

/// FAT中表示链表结尾的值
pub const FAT_EOC: u16 = 0xFFFF;

/// 根目录的目录项个数，恰好占满一个块
pub const FILE_MAX_COUNT: usize = 128;

/// 打开文件表的容量
pub const OPEN_MAX_COUNT: usize = 32;

/// 目录项中文件名字段的字节量，含结尾的NUL
pub const FILENAME_LEN: usize = 16;

/// 文件名的最大长度
pub const FILENAME_MAX_LEN: usize = FILENAME_LEN - 1;

/// 数据块数量的上限
pub const MAX_DATA_BLOCKS: usize = 8192;

/// 一个块能容纳的FAT条目数
pub const FAT_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / 2;
