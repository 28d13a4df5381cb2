//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备；
//! [`BlockDevice`] 是对一段定长、可随机读写的字节区域的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 与内核中的驱动不同，这里的读写都可能失败，错误以 [`io::Error`] 向上传递。


mod block_file;
mod mem_disk;

use std::any::Any;
use std::io;

pub use self::{block_file::BlockFile, mem_disk::MemDisk};

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    /// 从字节偏移 `offset` 处读满 `buf`
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// 把 `buf` 整体写到字节偏移 `offset` 处
    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()>;

    /// 设备当前的字节长度
    fn len(&self) -> io::Result<u64>;

    /// 截断或以零填充扩展设备
    fn set_len(&self, len: u64) -> io::Result<()>;

    #[inline]
    fn is_empty(&self) -> io::Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// 读取第 `block_id` 块，块大小即 `buf` 的长度
    #[inline]
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> io::Result<()> {
        self.read_at((block_id * buf.len()) as u64, buf)
    }

    /// 写入第 `block_id` 块，块大小即 `buf` 的长度
    #[inline]
    fn write_block(&self, block_id: usize, buf: &[u8]) -> io::Result<()> {
        self.write_at((block_id * buf.len()) as u64, buf)
    }

    /// 读取大端序的 16 位有符号整数
    fn read_i16(&self, offset: u64) -> io::Result<i16> {
        let mut raw = [0; 2];
        self.read_at(offset, &mut raw)?;
        Ok(i16::from_be_bytes(raw))
    }

    /// 以大端序写入 16 位有符号整数
    fn write_i16(&self, offset: u64, value: i16) -> io::Result<()> {
        self.write_at(offset, &value.to_be_bytes())
    }
}

/// 打开镜像时观察到的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    /// 空文件，已扩展到预期大小，需要格式化
    Blank,
    /// 比预期短，已用零补齐；`found` 为补齐前的长度
    Truncated { found: u64 },
    /// 长度足够，多余的尾部字节不予理会
    Intact,
}

impl ImageState {
    #[inline]
    pub fn needs_format(self) -> bool {
        self == Self::Blank
    }
}

/// 让设备至少拥有 `expected` 字节，并报告其原本的状态。
pub fn prepare(device: &dyn BlockDevice, expected: u64) -> io::Result<ImageState> {
    let state = if device.is_empty()? {
        device.set_len(expected)?;
        ImageState::Blank
    } else {
        let found = device.len()?;
        if found < expected {
            log::warn!("image is {found} bytes, extending to {expected}");
            device.set_len(expected)?;
            ImageState::Truncated { found }
        } else {
            ImageState::Intact
        }
    };

    log::debug!("image state={state:?}");
    Ok(state)
}
