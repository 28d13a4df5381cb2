use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::BlockDevice;

/// 内存中的镜像，行为与 [`BlockFile`](crate::BlockFile) 一致：
/// 越过末尾的读会失败，越过末尾的写会以零扩展。
#[derive(Debug, Default)]
pub struct MemDisk(Mutex<Vec<u8>>);

impl MemDisk {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Mutex::new(bytes))
    }

    /// 当前镜像内容的拷贝
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes().clone()
    }

    #[inline]
    fn bytes(&self) -> MutexGuard<'_, Vec<u8>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlockDevice for MemDisk {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let bytes = self.bytes();
        let start = offset as usize;
        let src = bytes
            .get(start..start + buf.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let mut bytes = self.bytes();
        let start = offset as usize;
        let end = start + buf.len();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.bytes().len() as u64)
    }

    fn set_len(&self, len: u64) -> io::Result<()> {
        self.bytes().resize(len as usize, 0);
        Ok(())
    }
}
