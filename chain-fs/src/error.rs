use std::io;

use derive_more::Display;

pub type Result<T> = core::result::Result<T, Error>;

/// 文件系统操作的错误。`Display` 的文本是稳定的，可以直接回给客户端。
#[derive(Debug, Display)]
pub enum Error {
    #[display(fmt = "invalid file name")]
    InvalidName,
    #[display(fmt = "file already exists")]
    AlreadyExists,
    #[display(fmt = "file does not exist")]
    NotFound,
    #[display(fmt = "no free file entry available")]
    NoFreeEntry,
    #[display(fmt = "file too large")]
    TooLarge,
    #[display(fmt = "not enough free blocks")]
    OutOfSpace,
    #[display(fmt = "I/O error: {}", _0)]
    Io(io::Error),
    #[display(fmt = "corrupted file system: {}", _0)]
    Corruption(String),
    /// 此前的致命错误使文件系统停止服务，附带当时的错误描述
    #[display(fmt = "file system halted: {}", _0)]
    Halted(String),
}

impl Error {
    #[inline]
    pub(crate) fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    /// 出现此类错误后，内存状态可能与磁盘不一致，调用者应停止服务
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Corruption(_) | Self::Halted(_))
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<binrw::Error> for Error {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(err) => Self::Io(err),
            err => Self::Corruption(err.to_string()),
        }
    }
}
