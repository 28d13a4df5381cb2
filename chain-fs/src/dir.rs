//! # 目录层
//!
//! 定长的文件项表，空槽位为 `None`。每次修改都先写盘，成功后才更新内存。

use crate::codec::MetaCodec;
use crate::layout::DirEntry;
use crate::{Error, Result, MAX_FILES, NIL};

#[derive(Debug, Default)]
pub struct Directory {
    slots: [Option<DirEntry>; MAX_FILES],
}

impl Directory {
    pub fn format(codec: &MetaCodec) -> Result<Self> {
        for slot in 0..MAX_FILES {
            codec.write_entry(slot, None)?;
        }

        Ok(Self::default())
    }

    /// 大小为 0 的文件项一律视为空链，首块不是 `-1` 时改写回磁盘
    pub fn load(codec: &MetaCodec) -> Result<Self> {
        let mut dir = Self::default();

        for slot in 0..MAX_FILES {
            let Some(mut entry) = codec.read_entry(slot)? else {
                continue;
            };
            if entry.size() == 0 && entry.first_block() != NIL {
                log::warn!(
                    "slot {slot}: empty file {:?} points at block {}, resetting",
                    entry.name(),
                    entry.first_block()
                );
                entry = entry.resized(0, NIL);
                codec.write_entry(slot, Some(&entry))?;
            }
            if dir.find_by_name(entry.name()).is_some() {
                return Err(Error::corruption(format!(
                    "file name {:?} appears twice",
                    entry.name()
                )));
            }
            dir.slots[slot] = Some(entry);
        }

        Ok(dir)
    }

    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|entry| entry.name() == name))
    }

    /// 编号最小的空槽位
    pub fn first_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&DirEntry> {
        self.slots[slot].as_ref()
    }

    pub fn put(&mut self, slot: usize, entry: DirEntry, codec: &MetaCodec) -> Result<()> {
        codec.write_entry(slot, Some(&entry))?;
        self.slots[slot] = Some(entry);
        Ok(())
    }

    pub fn clear(&mut self, slot: usize, codec: &MetaCodec) -> Result<()> {
        codec.write_entry(slot, None)?;
        self.slots[slot] = None;
        Ok(())
    }

    /// 按槽位顺序遍历已占用的文件项
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DirEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|entry| (slot, entry)))
    }

    #[inline]
    pub fn occupied(&self) -> usize {
        self.iter().count()
    }
}
