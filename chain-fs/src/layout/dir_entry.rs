use binrw::binrw;

use crate::{Error, Result, NAME_MAX, NIL};

/// 目录项在磁盘上的原样表示：文件名右侧以零填充，整数均为大端序
#[binrw]
#[brw(big)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawDirEntry {
    name: [u8; NAME_MAX],
    size: i16,
    first_block: i16,
}

/// 内存中的文件项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    size: u16,
    /// 空文件为 [`NIL`]
    first_block: i16,
}

/// 文件名须非空、不超过 [`NAME_MAX`] 字节、全为 ASCII 且不含 `\0`
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= NAME_MAX
        && name.bytes().all(|c| c.is_ascii() && c != 0);

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName)
    }
}

impl DirEntry {
    /// 新建的文件没有任何块。调用前名字须已通过 [`validate_name`]。
    #[inline]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            size: 0,
            first_block: NIL,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size as usize
    }

    #[inline]
    pub fn first_block(&self) -> i16 {
        self.first_block
    }

    /// 同名、换了一条块链的文件项
    pub fn resized(&self, size: usize, first_block: i16) -> Self {
        Self {
            name: self.name.clone(),
            size: size as u16,
            first_block,
        }
    }
}

impl RawDirEntry {
    /// 空槽位：名字全零，大小为 0，首块为 -1
    pub const EMPTY: Self = Self {
        name: [0; NAME_MAX],
        size: 0,
        first_block: NIL,
    };

    /// 首字节为零表示空槽位
    pub fn decode(self) -> Result<Option<DirEntry>> {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(NAME_MAX);
        if len == 0 {
            return Ok(None);
        }

        let name = core::str::from_utf8(&self.name[..len])
            .ok()
            .filter(|name| name.is_ascii())
            .ok_or_else(|| Error::corruption("non-ASCII file name"))?;
        let size = u16::try_from(self.size)
            .map_err(|_| Error::corruption(format!("file {name:?} has negative size")))?;

        Ok(Some(DirEntry {
            name: name.to_owned(),
            size,
            first_block: self.first_block,
        }))
    }
}

impl From<&DirEntry> for RawDirEntry {
    fn from(entry: &DirEntry) -> Self {
        let bytes = entry.name.as_bytes();
        let mut name = [0; NAME_MAX];
        name[..bytes.len()].copy_from_slice(bytes);

        Self {
            name,
            size: entry.size as i16,
            first_block: entry.first_block,
        }
    }
}
