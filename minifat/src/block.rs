use derive_more::{Display, From, Into};

use crate::config::FAT_EOC;

/// 数据块编号，相对于数据区起点。
///
/// 同时也是FAT条目的取值：[`BlockId::FREE`]、[`BlockId::EOC`]或下一块的编号。
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct BlockId(u16);

impl From<BlockId> for usize {
    fn from(id: BlockId) -> Self {
        id.0 as usize
    }
}

impl BlockId {
    pub const FREE: Self = Self(0);

    /// 最小的可分配块号，0号条目保留
    pub const MIN: Self = Self(1);

    pub const EOC: Self = Self(FAT_EOC);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn is_eoc(self) -> bool {
        self.0 == FAT_EOC
    }

    /// 把数据区内的下标转成块号，`index`须小于数据块总数
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u16)
    }

    /// `Some`表示指向一个真实的块，`None`表示空链表
    pub const fn as_option(self) -> Option<Self> {
        if self.is_eoc() {
            None
        } else {
            Some(self)
        }
    }
}
