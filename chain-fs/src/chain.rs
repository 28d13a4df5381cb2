//! # 块链管理层
//!
//! 在内存中维护节点表与空闲位图的镜像；任何改动都会立即经由 [`MetaCodec`] 写回磁盘。

use crate::codec::MetaCodec;
use crate::layout::ChainNode;
use crate::{Error, Result};
use crate::{MAX_BLOCKS, META_BLOCKS, NIL};

#[derive(Debug)]
pub struct ChainTable {
    nodes: [ChainNode; MAX_BLOCKS],
    /// 只有数据块可能为空闲
    free: [bool; MAX_BLOCKS],
}

/// 若 `raw` 指向一个数据块，返回其编号
#[inline]
fn data_block(raw: i16) -> Option<usize> {
    usize::try_from(raw)
        .ok()
        .filter(|block| (META_BLOCKS..MAX_BLOCKS).contains(block))
}

/// 块链的首块，空链为 [`NIL`]
#[inline]
pub fn head(chain: &[usize]) -> i16 {
    chain.first().map_or(NIL, |&block| block as i16)
}

impl ChainTable {
    /// 元数据块标记为已分配，数据块全部空闲并清零
    pub fn format(codec: &MetaCodec) -> Result<Self> {
        let mut table = Self::blank();

        for block in 0..MAX_BLOCKS {
            if block < META_BLOCKS {
                table.nodes[block] = ChainNode::allocated(block, None);
            } else {
                table.nodes[block] = ChainNode::free(block);
                table.free[block] = true;
                codec.zero_data_block(block)?;
            }
            codec.write_node(block, table.nodes[block])?;
        }

        Ok(table)
    }

    /// 从磁盘读入节点表并据此重建空闲位图
    pub fn load(codec: &MetaCodec) -> Result<Self> {
        let mut table = Self::blank();

        for block in 0..MAX_BLOCKS {
            let node = codec.read_node(block)?;
            table.nodes[block] = node;
            table.free[block] = block >= META_BLOCKS && !node.is_allocated();
        }

        Ok(table)
    }

    /// 以各文件实际引用的块为准，纠正游离的节点。
    ///
    /// 被引用的块已由 [`walk`](Self::walk) 确认过，这里只处理元数据块与未被引用的数据块。
    pub fn reconcile(&mut self, referenced: &[bool; MAX_BLOCKS], codec: &MetaCodec) -> Result<()> {
        for block in 0..MAX_BLOCKS {
            if referenced[block] {
                self.free[block] = false;
                continue;
            }

            let expected = if block < META_BLOCKS {
                ChainNode::allocated(block, None)
            } else {
                ChainNode::free(block)
            };
            if self.nodes[block] != expected {
                log::warn!(
                    "block {block}: stray node {:?}, rewriting as {expected:?}",
                    self.nodes[block]
                );
                codec.write_node(block, expected)?;
                self.nodes[block] = expected;
            }
            self.free[block] = block >= META_BLOCKS;
        }

        Ok(())
    }

    /// 从 `first_block` 出发沿 `next` 走完整条链，按顺序返回块编号。
    ///
    /// 越界、指向元数据块、指向未分配块或者成环都视为损坏，所以即便镜像被破坏也不会死循环。
    pub fn walk(&self, first_block: i16) -> Result<Vec<usize>> {
        let mut chain = Vec::new();
        let mut visited = [false; MAX_BLOCKS];
        let mut current = first_block;

        while current != NIL {
            let block = data_block(current).ok_or_else(|| {
                Error::corruption(format!("block index {current} is not a data block"))
            })?;
            if visited[block] {
                return Err(Error::corruption(format!("chain cycles through block {block}")));
            }

            let node = self.nodes[block];
            if !node.owns(block) {
                return Err(Error::corruption(format!(
                    "block {block} is chained but not allocated"
                )));
            }
            if node.next() == current {
                return Err(Error::corruption(format!("block {block} links to itself")));
            }

            visited[block] = true;
            chain.push(block);
            current = node.next();
        }

        Ok(chain)
    }

    /// 规划一条长为 `new_len` 的新链：先按顺序沿用 `old` 的前缀，
    /// 不够时再按编号从小到大取空闲数据块。不修改任何状态。
    pub fn plan_replace(&self, old: &[usize], new_len: usize) -> Result<Vec<usize>> {
        let recycled = new_len.min(old.len());
        let mut chain = old[..recycled].to_vec();
        chain.extend(
            (META_BLOCKS..MAX_BLOCKS)
                .filter(|&block| self.free[block])
                .take(new_len - recycled),
        );

        if chain.len() < new_len {
            return Err(Error::OutOfSpace);
        }

        log::debug!("plan: {old:?} -> {chain:?}");
        Ok(chain)
    }

    /// 把 `chain` 串成一条链并写回
    pub fn commit_chain(&mut self, chain: &[usize], codec: &MetaCodec) -> Result<()> {
        for (pos, &block) in chain.iter().enumerate() {
            let node = ChainNode::allocated(block, chain.get(pos + 1).copied());
            codec.write_node(block, node)?;
            self.nodes[block] = node;
            self.free[block] = false;
        }

        Ok(())
    }

    /// 回收 `blocks`，数据块的内容会被清零
    pub fn release(&mut self, blocks: &[usize], codec: &MetaCodec) -> Result<()> {
        for &block in blocks {
            let node = ChainNode::free(block);
            codec.write_node(block, node)?;
            self.nodes[block] = node;
            self.free[block] = block >= META_BLOCKS;
            if block >= META_BLOCKS {
                codec.zero_data_block(block)?;
            }
        }

        Ok(())
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.iter().filter(|&&free| free).count()
    }

    #[inline]
    pub fn is_free(&self, block: usize) -> bool {
        self.free[block]
    }

    #[inline]
    pub fn node(&self, block: usize) -> ChainNode {
        self.nodes[block]
    }
}

impl ChainTable {
    fn blank() -> Self {
        Self {
            nodes: [ChainNode::free(0); MAX_BLOCKS],
            free: [false; MAX_BLOCKS],
        }
    }
}
