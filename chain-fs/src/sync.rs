//! 公平读写锁
//!
//! 标准库的 [`RwLock`] 没有承诺调度策略，持续的读者可能让写者一直等下去。
//! 这里在它前面加一道闸门：写者在等待期间一直持有闸门，
//! 后来的读者必须先穿过闸门，因此无法插队到正在等待的写者之前。

use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct FairRwLock<T> {
    turnstile: Mutex<()>,
    inner: RwLock<T>,
}

impl<T> FairRwLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            turnstile: Mutex::new(()),
            inner: RwLock::new(value),
        }
    }

    /// 锁中毒会被忽略：持锁时 panic 与操作中途的 I/O 失败同样处理
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        drop(self.turnstile.lock().unwrap_or_else(PoisonError::into_inner));
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        let _turn = self.turnstile.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
