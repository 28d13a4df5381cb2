use binrw::binrw;

use crate::NIL;

/// 第 `i` 块的链节点。
///
/// `index >= 0` 表示该块已分配（给元数据或某个文件），此时它等于 `i`；
/// 空闲块存放 `-i`。`next` 为链上的下一块，[`NIL`] 结束整条链。
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainNode {
    index: i16,
    next: i16,
}

impl ChainNode {
    /// 已分配给链的块
    #[inline]
    pub const fn allocated(block: usize, next: Option<usize>) -> Self {
        Self {
            index: block as i16,
            next: match next {
                Some(next) => next as i16,
                None => NIL,
            },
        }
    }

    /// 空闲块
    #[inline]
    pub const fn free(block: usize) -> Self {
        Self {
            index: -(block as i16),
            next: NIL,
        }
    }

    #[inline]
    pub fn is_allocated(self) -> bool {
        self.index >= 0
    }

    /// 节点是否标记为分配给了第 `block` 块自身
    #[inline]
    pub fn owns(self, block: usize) -> bool {
        self.is_allocated() && self.index as usize == block
    }

    #[inline]
    pub fn next(self) -> i16 {
        self.next
    }
}
