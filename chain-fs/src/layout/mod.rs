//! # 磁盘数据结构层
//!
//! chain-fs 的磁盘布局：
//! 目录区 | 节点表 | (填充至 META_BLOCKS 块) | 数据块区域
//!
//! 目录区与节点表和第 0 块在物理上重叠，由 [`META_BLOCKS`](crate::META_BLOCKS) 把这些块保留下来。

/// 文件项，位于目录区
mod dir_entry;
pub use dir_entry::{validate_name, DirEntry, RawDirEntry};

/// 每个块对应一个链节点
mod chain_node;
pub use chain_node::ChainNode;

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite};

    use super::{ChainNode, DirEntry, RawDirEntry};
    use crate::{ENTRY_SIZE, NODE_SIZE};

    #[test]
    fn layout() {
        let mut buf = Cursor::new(Vec::new());
        RawDirEntry::EMPTY.write(&mut buf).unwrap();
        assert_eq!(ENTRY_SIZE, buf.get_ref().len());

        let mut buf = Cursor::new(Vec::new());
        ChainNode::free(3).write(&mut buf).unwrap();
        assert_eq!(NODE_SIZE, buf.get_ref().len());
    }

    #[test]
    fn dir_entry_bytes() {
        let entry = DirEntry::new("a.txt").resized(130, 1);
        let mut buf = Cursor::new(Vec::new());
        RawDirEntry::from(&entry).write(&mut buf).unwrap();
        assert_eq!(
            buf.get_ref().as_slice(),
            [b'a', b'.', b't', b'x', b't', 0, 0, 0, 0, 0, 0, 0x00, 0x82, 0x00, 0x01]
        );

        let back = RawDirEntry::read(&mut Cursor::new(buf.into_inner())).unwrap();
        assert_eq!(back.decode().unwrap(), Some(entry));
    }

    #[test]
    fn empty_slot_bytes() {
        let mut buf = Cursor::new(Vec::new());
        RawDirEntry::EMPTY.write(&mut buf).unwrap();
        assert_eq!(
            buf.get_ref().as_slice(),
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x00, 0x00, 0xFF, 0xFF]
        );
        assert_eq!(RawDirEntry::EMPTY.decode().unwrap(), None);
    }

    #[test]
    fn node_bytes() {
        let mut buf = Cursor::new(Vec::new());
        ChainNode::allocated(2, Some(7)).write(&mut buf).unwrap();
        ChainNode::allocated(7, None).write(&mut buf).unwrap();
        ChainNode::free(4).write(&mut buf).unwrap();
        assert_eq!(
            buf.get_ref().as_slice(),
            [0, 2, 0, 7, 0, 7, 0xFF, 0xFF, 0xFF, 0xFC, 0xFF, 0xFF]
        );
    }
}
