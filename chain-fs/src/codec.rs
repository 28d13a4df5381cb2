//! # 元数据编解码层
//!
//! 只有这一层知道各个结构在镜像中的偏移；
//! 上层通过 [`MetaCodec`] 读写目录项、链节点与数据块，不直接接触块设备。

use std::io::Cursor;
use std::sync::Arc;

use binrw::{BinRead, BinWrite};
use block_dev::BlockDevice;

use crate::layout::{ChainNode, DirEntry, RawDirEntry};
use crate::Result;
use crate::{BLOCK_SIZE, ENTRY_SIZE, MAX_FILES, NODE_SIZE};

/// 节点表紧跟在目录区之后
const NODE_AREA: usize = MAX_FILES * ENTRY_SIZE;

type DataBlock = [u8; BLOCK_SIZE];

pub struct MetaCodec {
    device: Arc<dyn BlockDevice>,
}

impl MetaCodec {
    #[inline]
    pub fn new(device: Arc<dyn BlockDevice>) -> Self {
        Self { device }
    }

    /// 写入第 `slot` 个目录项；`None` 会把整个槽位清空
    pub fn write_entry(&self, slot: usize, entry: Option<&DirEntry>) -> Result<()> {
        let raw = entry.map_or(RawDirEntry::EMPTY, RawDirEntry::from);
        let mut buf = Cursor::new(Vec::with_capacity(ENTRY_SIZE));
        raw.write(&mut buf)?;
        self.device
            .write_at(Self::entry_offset(slot), buf.get_ref())?;
        Ok(())
    }

    pub fn read_entry(&self, slot: usize) -> Result<Option<DirEntry>> {
        let mut buf = [0; ENTRY_SIZE];
        self.device.read_at(Self::entry_offset(slot), &mut buf)?;
        RawDirEntry::read(&mut Cursor::new(&buf))?.decode()
    }

    pub fn write_node(&self, block: usize, node: ChainNode) -> Result<()> {
        let mut buf = Cursor::new(Vec::with_capacity(NODE_SIZE));
        node.write(&mut buf)?;
        self.device.write_at(Self::node_offset(block), buf.get_ref())?;
        Ok(())
    }

    pub fn read_node(&self, block: usize) -> Result<ChainNode> {
        let mut buf = [0; NODE_SIZE];
        self.device.read_at(Self::node_offset(block), &mut buf)?;
        Ok(ChainNode::read(&mut Cursor::new(&buf))?)
    }

    pub fn zero_data_block(&self, block: usize) -> Result<()> {
        let data: DataBlock = [0; BLOCK_SIZE];
        self.device.write_block(block, &data)?;
        Ok(())
    }

    /// 把 `src` 写在块首，块内剩余部分以零填充
    pub fn write_data(&self, block: usize, src: &[u8]) -> Result<()> {
        let mut data: DataBlock = [0; BLOCK_SIZE];
        data[..src.len()].copy_from_slice(src);
        self.device.write_block(block, &data)?;
        Ok(())
    }

    /// 从块首读满 `dst`
    pub fn read_data(&self, block: usize, dst: &mut [u8]) -> Result<()> {
        assert!(dst.len() <= BLOCK_SIZE);
        self.device
            .read_at((block * BLOCK_SIZE) as u64, dst)?;
        Ok(())
    }
}

impl MetaCodec {
    #[inline]
    fn entry_offset(slot: usize) -> u64 {
        assert!(slot < MAX_FILES);
        (slot * ENTRY_SIZE) as u64
    }

    #[inline]
    fn node_offset(block: usize) -> u64 {
        (NODE_AREA + block * NODE_SIZE) as u64
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use block_dev::{BlockDevice, MemDisk};

    use super::MetaCodec;
    use crate::layout::{ChainNode, DirEntry};
    use crate::{BLOCK_SIZE, TOTAL_SIZE};

    fn codec() -> (Arc<MemDisk>, MetaCodec) {
        let disk = Arc::new(MemDisk::from_bytes(vec![0; TOTAL_SIZE]));
        let codec = MetaCodec::new(disk.clone());
        (disk, codec)
    }

    #[test]
    fn entry_offsets() {
        let (disk, codec) = codec();
        let entry = DirEntry::new("b").resized(5, 3);
        codec.write_entry(2, Some(&entry)).unwrap();

        let bytes = disk.snapshot();
        assert_eq!(bytes[30], b'b');
        assert!(bytes[31..41].iter().all(|&b| b == 0));
        assert_eq!(bytes[41..45], [0, 5, 0, 3]);
        assert_eq!(codec.read_entry(2).unwrap(), Some(entry));

        codec.write_entry(2, None).unwrap();
        assert_eq!(codec.read_entry(2).unwrap(), None);
        assert!(disk.snapshot()[30..41].iter().all(|&b| b == 0));
    }

    #[test]
    fn node_offsets() {
        let (disk, codec) = codec();
        codec.write_node(9, ChainNode::free(9)).unwrap();
        assert_eq!(disk.snapshot()[75 + 36..75 + 40], [0xFF, 0xF7, 0xFF, 0xFF]);
        assert_eq!(codec.read_node(9).unwrap(), ChainNode::free(9));
    }

    #[test]
    fn data_is_padded_and_read_back() {
        let (disk, codec) = codec();
        disk.write_block(4, &[0xEE; BLOCK_SIZE]).unwrap();

        codec.write_data(4, b"hello").unwrap();
        let bytes = disk.snapshot();
        assert_eq!(&bytes[512..517], b"hello");
        assert!(bytes[517..640].iter().all(|&b| b == 0));

        let mut buf = [0; 3];
        codec.read_data(4, &mut buf).unwrap();
        assert_eq!(&buf, b"hel");
        assert_eq!(disk.snapshot(), bytes, "reading must not modify the image");

        codec.zero_data_block(4).unwrap();
        assert!(disk.snapshot()[512..640].iter().all(|&b| b == 0));
    }

    #[test]
    fn undecodable_name_is_corruption() {
        let (disk, codec) = codec();
        disk.write_at(0, &[0xC3, 0xA9]).unwrap();
        assert!(matches!(
            codec.read_entry(0),
            Err(crate::Error::Corruption(_))
        ));
    }
}
