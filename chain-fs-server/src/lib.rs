//! 基于文本行协议的文件服务：每个连接一个线程，共享同一个 [`FileStore`]。

#[cfg(test)]
mod tests;

mod protocol;
mod session;

use std::io;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use chain_fs::FileStore;

pub use self::{
    protocol::{ParseError, Request},
    session::{handle_client, serve},
};

/// 不断接受连接，为每个客户端起一个线程。
///
/// 单个连接的失败只记录日志；文件系统停止服务后不再接受新连接并返回错误。
pub fn run(listener: TcpListener, store: Arc<FileStore>) -> io::Result<()> {
    log::info!("listening on {}", listener.local_addr()?);

    for (id, stream) in listener.incoming().enumerate() {
        if let Some(fault) = store.fault() {
            log::error!("file system halted, no longer accepting clients");
            return Err(io::Error::other(format!("file system halted: {fault}")));
        }

        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                log::error!("accept failed: {err}");
                continue;
            }
        };

        let store = store.clone();
        let spawned = thread::Builder::new()
            .name(format!("client-{id}"))
            .spawn(move || handle_client(stream, &store));
        if let Err(err) = spawned {
            log::error!("cannot spawn a thread for client {id}: {err}");
        }
    }

    Ok(())
}
