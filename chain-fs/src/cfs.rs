//! # 文件系统层
//!
//! 把目录、块链与编解码层组合起来，实现创建、读写、删除与列举，
//! 并在每个操作结束时维持以下不变式：
//!
//! - 已占用的槽位名字非空且互不相同；
//! - 每个文件的块链长度恰为 `ceil(size / BLOCK_SIZE)`，只含数据块，并以 `-1` 结束；
//! - 任一块至多出现在一条链上；
//! - 块空闲当且仅当它是未被引用的数据块；
//! - 内存中的目录、节点表与空闲位图和磁盘一致。
//!
//! 这一层自身不加锁，并发控制由 [`FileStore`](crate::FileStore) 负责。

use std::sync::Arc;

use block_dev::BlockDevice;

use crate::chain::{self, ChainTable};
use crate::codec::MetaCodec;
use crate::dir::Directory;
use crate::layout::{validate_name, DirEntry};
use crate::{blocks_for, Error, Result};
use crate::{MAX_BLOCKS, MAX_FILES, MAX_FILE_SIZE, META_BLOCKS, TOTAL_SIZE};

pub struct ChainFileSystem {
    codec: MetaCodec,
    directory: Directory,
    chains: ChainTable,
}

/// 文件的概况
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub slot: usize,
    pub name: String,
    pub size: usize,
    /// 按链上顺序排列的块编号
    pub blocks: Vec<usize>,
}

impl ChainFileSystem {
    /// 挂载块设备：空镜像会被格式化，其余情况从磁盘加载并校验
    pub fn mount(device: Arc<dyn BlockDevice>) -> Result<Self> {
        let state = block_dev::prepare(device.as_ref(), TOTAL_SIZE as u64)?;
        let codec = MetaCodec::new(device);

        if state.needs_format() {
            Self::format(codec)
        } else {
            Self::load(codec)
        }
    }

    fn format(codec: MetaCodec) -> Result<Self> {
        log::info!(
            "formatting image: {MAX_FILES} entries, {MAX_BLOCKS} blocks, {META_BLOCKS} reserved"
        );
        let directory = Directory::format(&codec)?;
        let chains = ChainTable::format(&codec)?;

        Ok(Self {
            codec,
            directory,
            chains,
        })
    }

    fn load(codec: MetaCodec) -> Result<Self> {
        let directory = Directory::load(&codec)?;
        let chains = ChainTable::load(&codec)?;
        let mut fs = Self {
            codec,
            directory,
            chains,
        };

        let referenced = fs.referenced_blocks()?;
        fs.chains.reconcile(&referenced, &fs.codec)?;
        log::info!(
            "loaded image: {} files, {} free blocks",
            fs.directory.occupied(),
            fs.chains.free_count()
        );

        Ok(fs)
    }
}

impl ChainFileSystem {
    pub fn create(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.directory.find_by_name(name).is_some() {
            return Err(Error::AlreadyExists);
        }
        let slot = self
            .directory
            .first_free_slot()
            .ok_or(Error::NoFreeEntry)?;

        self.directory.put(slot, DirEntry::new(name), &self.codec)?;
        log::debug!("create {name:?} in slot {slot}");
        Ok(())
    }

    /// 用 `data` 替换文件的全部内容。
    ///
    /// 大小与空间的检查都在改动任何状态之前完成，失败时文件保持原样。
    /// 写盘顺序：数据块、链节点、目录项，最后回收不再使用的旧块。
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let (slot, entry) = self.lookup(name)?;
        if data.len() > MAX_FILE_SIZE {
            return Err(Error::TooLarge);
        }

        let entry = entry.clone();
        let old = self.chains.walk(entry.first_block())?;
        let new = self.chains.plan_replace(&old, blocks_for(data.len()))?;

        for (&block, chunk) in new.iter().zip(data.chunks(crate::BLOCK_SIZE)) {
            self.codec.write_data(block, chunk)?;
        }
        self.chains.commit_chain(&new, &self.codec)?;

        let entry = entry.resized(data.len(), chain::head(&new));
        self.directory.put(slot, entry, &self.codec)?;
        self.chains
            .release(&old[new.len().min(old.len())..], &self.codec)?;

        log::debug!("write {name:?}: {} bytes in {new:?}", data.len());
        Ok(())
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let (_, entry) = self.lookup(name)?;
        let chain = self.chain_of(entry)?;

        let mut data = vec![0; entry.size()];
        for (&block, chunk) in chain.iter().zip(data.chunks_mut(crate::BLOCK_SIZE)) {
            self.codec.read_data(block, chunk)?;
        }

        log::debug!("read {name:?}: {} bytes", data.len());
        Ok(data)
    }

    /// 先清空目录项再回收块，中途失败也不会留下指向空闲块的文件
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let (slot, entry) = self.lookup(name)?;
        let chain = self.chains.walk(entry.first_block())?;

        self.directory.clear(slot, &self.codec)?;
        self.chains.release(&chain, &self.codec)?;

        log::debug!("delete {name:?} from slot {slot}, released {chain:?}");
        Ok(())
    }

    /// 按槽位顺序列出全部文件名
    pub fn list(&self) -> Vec<String> {
        self.directory
            .iter()
            .map(|(_, entry)| entry.name().to_owned())
            .collect()
    }

    pub fn stat(&self, name: &str) -> Result<FileStat> {
        let (slot, entry) = self.lookup(name)?;

        Ok(FileStat {
            slot,
            name: entry.name().to_owned(),
            size: entry.size(),
            blocks: self.chain_of(entry)?,
        })
    }

    #[inline]
    pub fn free_blocks(&self) -> usize {
        self.chains.free_count()
    }

    #[inline]
    pub fn file_count(&self) -> usize {
        self.directory.occupied()
    }

    /// 核对内存中的目录、节点表与空闲位图是否满足全部不变式
    pub fn check(&self) -> Result<()> {
        for (slot, entry) in self.directory.iter() {
            validate_name(entry.name())
                .map_err(|_| Error::corruption(format!("slot {slot} has an invalid name")))?;
            if self.directory.find_by_name(entry.name()) != Some(slot) {
                return Err(Error::corruption(format!(
                    "file name {:?} appears twice",
                    entry.name()
                )));
            }
        }

        let referenced = self.referenced_blocks()?;
        for block in 0..MAX_BLOCKS {
            let node = self.chains.node(block);
            let should_be_free = block >= META_BLOCKS && !referenced[block];

            if self.chains.is_free(block) != should_be_free {
                return Err(Error::corruption(format!(
                    "free bitmap disagrees at block {block}"
                )));
            }
            if node.is_allocated() == should_be_free {
                return Err(Error::corruption(format!(
                    "node {block} disagrees with the free bitmap"
                )));
            }
        }

        Ok(())
    }
}

impl ChainFileSystem {
    fn lookup(&self, name: &str) -> Result<(usize, &DirEntry)> {
        self.directory
            .find_by_name(name)
            .and_then(|slot| Some((slot, self.directory.get(slot)?)))
            .ok_or(Error::NotFound)
    }

    /// 走完文件的块链，并确认其长度与文件大小相符
    fn chain_of(&self, entry: &DirEntry) -> Result<Vec<usize>> {
        let chain = self.chains.walk(entry.first_block())?;
        if chain.len() != blocks_for(entry.size()) {
            return Err(Error::corruption(format!(
                "file {:?} has {} bytes but {} blocks",
                entry.name(),
                entry.size(),
                chain.len()
            )));
        }

        Ok(chain)
    }

    /// 收集所有文件引用的块，顺带确认没有块被两条链共享
    fn referenced_blocks(&self) -> Result<[bool; MAX_BLOCKS]> {
        let mut referenced = [false; MAX_BLOCKS];

        for (_, entry) in self.directory.iter() {
            for block in self.chain_of(entry)? {
                if referenced[block] {
                    return Err(Error::corruption(format!(
                        "block {block} is shared by several files"
                    )));
                }
                referenced[block] = true;
            }
        }

        Ok(referenced)
    }
}
