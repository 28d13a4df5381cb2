//! # 文件管理层
//!
//! [`FileStore`] 是对外的入口：整个文件系统由一把公平读写锁保护。
//! `read`、`list` 等只读操作持读锁，`create`、`write`、`delete` 持写锁。
//!
//! 进程里不存在全局实例，由调用者构造一个 [`FileStore`]，
//! 再以 `Arc<FileStore>` 的形式交给各个连接。
//!
//! 一旦某个操作返回致命错误（[`Error::is_fatal`]），内存与磁盘可能已不一致，
//! 此后所有操作都返回 [`Error::Halted`]，直到重新挂载。

use std::path::Path;
use std::sync::{Arc, OnceLock, RwLockReadGuard, RwLockWriteGuard};

use block_dev::{BlockDevice, BlockFile};

use crate::{ChainFileSystem, Error, FairRwLock, FileStat, Result};

pub struct FileStore {
    fs: FairRwLock<ChainFileSystem>,
    /// 第一个致命错误的描述
    fault: OnceLock<String>,
}

impl FileStore {
    /// 打开（必要时创建并格式化）宿主机上的镜像文件
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("opening image {}", path.display());
        Self::mount(Arc::new(BlockFile::open(path)?))
    }

    pub fn mount(device: Arc<dyn BlockDevice>) -> Result<Self> {
        Ok(Self {
            fs: FairRwLock::new(ChainFileSystem::mount(device)?),
            fault: OnceLock::new(),
        })
    }

    /// 停止服务的原因；正常时为 `None`
    #[inline]
    pub fn fault(&self) -> Option<&str> {
        self.fault.get().map(String::as_str)
    }

    /// 取得读锁，可在一次加锁内组合多个只读操作
    pub fn read_lock(&self) -> Result<RwLockReadGuard<'_, ChainFileSystem>> {
        let fs = self.fs.read();
        self.ensure_running()?;
        Ok(fs)
    }

    /// 取得写锁。经由守卫的操作若返回致命错误，调用者须交给 [`halt`](Self::halt)
    pub fn write_lock(&self) -> Result<RwLockWriteGuard<'_, ChainFileSystem>> {
        let fs = self.fs.write();
        self.ensure_running()?;
        Ok(fs)
    }

    /// 记录致命错误，此后的操作一律失败；非致命错误被忽略
    pub fn halt(&self, err: &Error) {
        if err.is_fatal() && self.fault.set(err.to_string()).is_ok() {
            log::error!("file store halted: {err}");
        }
    }

    pub fn create(&self, name: &str) -> Result<()> {
        let mut fs = self.write_lock()?;
        self.track(fs.create(name))
    }

    pub fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let mut fs = self.write_lock()?;
        self.track(fs.write(name, data))
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let fs = self.read_lock()?;
        self.track(fs.read(name))
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let mut fs = self.write_lock()?;
        self.track(fs.delete(name))
    }

    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self.read_lock()?.list())
    }

    pub fn stat(&self, name: &str) -> Result<FileStat> {
        let fs = self.read_lock()?;
        self.track(fs.stat(name))
    }

    /// 只读内存状态，停止服务后仍可调用
    pub fn free_blocks(&self) -> usize {
        self.fs.read().free_blocks()
    }

    pub fn file_count(&self) -> usize {
        self.fs.read().file_count()
    }

    pub fn check(&self) -> Result<()> {
        let fs = self.read_lock()?;
        self.track(fs.check())
    }
}

impl FileStore {
    fn ensure_running(&self) -> Result<()> {
        match self.fault() {
            Some(cause) => Err(Error::Halted(cause.to_owned())),
            None => Ok(()),
        }
    }

    /// 在仍持有锁时记录致命错误，后续拿到锁的操作必然看到它
    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.halt(err);
        }
        result
    }
}
