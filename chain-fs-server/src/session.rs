//! 单个客户端的请求循环

use std::borrow::Cow;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::TcpStream;

use chain_fs::FileStore;

use crate::Request;

/// 处理一个 TCP 连接直到对方断开或发送 `QUIT`
pub fn handle_client(stream: TcpStream, store: &FileStore) {
    let peer = stream
        .peer_addr()
        .map_or(Cow::Borrowed("<unknown>"), |addr| addr.to_string().into());
    log::info!("client {peer} connected");

    let result = stream
        .try_clone()
        .and_then(|reader| serve(store, BufReader::new(reader), BufWriter::new(stream)));
    match result {
        Ok(()) => log::info!("client {peer} disconnected"),
        Err(err) => log::warn!("client {peer}: {err}"),
    }
}

/// 逐行读取请求并逐行应答。
///
/// 读到 `QUIT` 或输入结束时正常返回。文件系统的致命错误在回复客户端后结束会话，
/// 此时 [`FileStore`] 已停止服务，其余会话的后续请求同样会失败。
pub fn serve(store: &FileStore, mut reader: impl BufRead, mut writer: impl Write) -> io::Result<()> {
    let mut raw = Vec::new();

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&raw);
        log::debug!("received {:?}", line.trim_end());

        let request = match Request::parse(&line) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(err) => {
                writeln!(writer, "ERROR: {err}")?;
                writer.flush()?;
                continue;
            }
        };

        let reply = execute(store, &request);
        let text = match &reply {
            Ok(text) => text.as_str(),
            Err(failure) => failure.message(),
        };
        writeln!(writer, "{text}")?;
        writer.flush()?;

        match (request, reply) {
            (Request::Quit, _) => return Ok(()),
            (_, Err(Failure::Fatal(msg))) => {
                return Err(io::Error::other(msg));
            }
            _ => {}
        }
    }
}

/// 失败回复；致命错误说明文件系统可能已与磁盘不一致
enum Failure {
    Recoverable(String),
    Fatal(String),
}

impl Failure {
    fn message(&self) -> &str {
        match self {
            Self::Recoverable(msg) | Self::Fatal(msg) => msg,
        }
    }
}

fn execute(store: &FileStore, request: &Request<'_>) -> Result<String, Failure> {
    let reply = match *request {
        Request::Create(name) => store
            .create(name)
            .map(|()| format!("SUCCESS: File '{name}' created.")),
        Request::Write(name, content) => store
            .write(name, content.as_bytes())
            .map(|()| format!("SUCCESS: Written to file '{name}'.")),
        Request::Read(name) => store.read(name).map(|data| {
            format!(
                "SUCCESS: Read from file '{name}': {}",
                String::from_utf8_lossy(&data)
            )
        }),
        Request::Delete(name) => store
            .delete(name)
            .map(|()| format!("SUCCESS: File '{name}' deleted.")),
        Request::List => store.list().map(|names| {
            names
                .iter()
                .fold(String::from("SUCCESS: Files:"), |mut reply, name| {
                    reply.push(' ');
                    reply.push_str(name);
                    reply
                })
        }),
        Request::Quit => Ok(String::from("SUCCESS: Disconnecting.")),
    };

    reply.map_err(|err| {
        let msg = format!("ERROR: {err}");
        if err.is_fatal() {
            log::error!("{request:?} failed: {err}");
            Failure::Fatal(msg)
        } else {
            Failure::Recoverable(msg)
        }
    })
}
