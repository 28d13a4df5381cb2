use std::io::{self, BufRead, BufReader, Cursor, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chain_fs::{BlockDevice, FileStore, MemDisk};
use socket2::SockRef;

use crate::serve;

fn store() -> FileStore {
    FileStore::mount(Arc::new(MemDisk::new())).unwrap()
}

/// 跑完一段脚本，返回逐行的回复以及会话的结局
fn session(store: &FileStore, script: &str) -> (Vec<String>, io::Result<()>) {
    let mut out = Vec::new();
    let result = serve(store, Cursor::new(script.as_bytes()), &mut out);
    let replies = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect();
    (replies, result)
}

fn transcript(store: &FileStore, script: &str) -> Vec<String> {
    let (replies, result) = session(store, script);
    result.unwrap();
    replies
}

/// 一问一答地与服务器交谈
fn talk(addr: SocketAddr, lines: &[&str]) -> Vec<String> {
    let mut stream = TcpStream::connect(addr).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    lines
        .iter()
        .map(|line| {
            writeln!(stream, "{line}").unwrap();
            let mut reply = String::new();
            reader.read_line(&mut reply).unwrap();
            reply.trim_end().to_owned()
        })
        .collect()
}

/// 写入次数用尽后，每次写都返回 I/O 错误
#[derive(Default)]
struct FaultyDisk {
    disk: MemDisk,
    writes_left: Mutex<Option<usize>>,
}

impl FaultyDisk {
    fn fail_after(&self, writes: usize) {
        *self.writes_left.lock().unwrap() = Some(writes);
    }
}

impl BlockDevice for FaultyDisk {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.disk.read_at(offset, buf)
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
        if let Some(left) = self.writes_left.lock().unwrap().as_mut() {
            if *left == 0 {
                return Err(io::Error::other("disk unplugged"));
            }
            *left -= 1;
        }
        self.disk.write_at(offset, buf)
    }

    fn len(&self) -> io::Result<u64> {
        self.disk.len()
    }

    fn set_len(&self, len: u64) -> io::Result<()> {
        self.disk.set_len(len)
    }
}

#[test]
fn full_session() {
    let store = store();
    let replies = transcript(
        &store,
        "CREATE a\nCREATE b\nWRITE a hello there\nREAD a\nLIST\nDELETE b\nLIST\nQUIT\nLIST\n",
    );

    assert_eq!(
        replies,
        [
            "SUCCESS: File 'a' created.",
            "SUCCESS: File 'b' created.",
            "SUCCESS: Written to file 'a'.",
            "SUCCESS: Read from file 'a': hello there",
            "SUCCESS: Files: a b",
            "SUCCESS: File 'b' deleted.",
            "SUCCESS: Files: a",
            "SUCCESS: Disconnecting.",
        ]
    );
    assert_eq!(store.read("a").unwrap(), b"hello there");
}

#[test]
fn errors_are_reported_and_session_continues() {
    let store = store();
    let replies = transcript(
        &store,
        "CREATE\r\nWRITE a\r\nFROB\r\n\r\nREAD nope\r\nCREATE much_too_long\r\nCREATE x\r\nCREATE x\r\n",
    );

    assert_eq!(
        replies,
        [
            "ERROR: Filename required.",
            "ERROR: Filename and content required.",
            "ERROR: Unknown command.",
            "ERROR: file does not exist",
            "ERROR: invalid file name",
            "SUCCESS: File 'x' created.",
            "ERROR: file already exists",
        ]
    );
}

#[test]
fn empty_listing_and_read() {
    let store = store();
    let replies = transcript(&store, "list\ncreate e\nread e\n");
    assert_eq!(
        replies,
        [
            "SUCCESS: Files:",
            "SUCCESS: File 'e' created.",
            "SUCCESS: Read from file 'e': ",
        ]
    );
}

#[test]
fn oversized_write_is_rejected() {
    let store = store();
    let big = "z".repeat(chain_fs::MAX_FILE_SIZE + 1);
    let replies = transcript(&store, &format!("CREATE f\nWRITE f {big}\nREAD f\n"));
    assert_eq!(
        replies,
        [
            "SUCCESS: File 'f' created.",
            "ERROR: file too large",
            "SUCCESS: Read from file 'f': ",
        ]
    );
}

#[test]
fn tcp_clients_share_one_store() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let store = Arc::new(store());
    {
        let store = store.clone();
        thread::spawn(move || crate::run(listener, store));
    }

    assert_eq!(
        talk(addr, &["CREATE net", "WRITE net over the wire", "QUIT"]),
        [
            "SUCCESS: File 'net' created.",
            "SUCCESS: Written to file 'net'.",
            "SUCCESS: Disconnecting.",
        ]
    );
    assert_eq!(
        talk(addr, &["READ net", "LIST"]),
        ["SUCCESS: Read from file 'net': over the wire", "SUCCESS: Files: net"]
    );
    assert_eq!(store.list().unwrap(), ["net"]);
}

#[test]
fn reset_client_does_not_stop_the_server() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    // 在服务器接受之前就以 RST 断开
    for _ in 0..4 {
        let reset = TcpStream::connect(addr).unwrap();
        SockRef::from(&reset).set_linger(Some(Duration::ZERO)).unwrap();
    }

    let server = thread::spawn(move || crate::run(listener, Arc::new(store())));
    assert_eq!(talk(addr, &["CREATE after"]), ["SUCCESS: File 'after' created."]);
    assert!(!server.is_finished());
}

#[test]
fn fatal_error_is_shared_by_every_session() {
    let disk = Arc::new(FaultyDisk::default());
    let store = FileStore::mount(disk.clone()).unwrap();
    let old = "o".repeat(200);
    let new = "n".repeat(200);
    transcript(&store, &format!("CREATE a\nWRITE a {old}\n"));

    disk.fail_after(1);
    let (replies, result) = session(&store, &format!("WRITE a {new}\nREAD a\n"));
    assert_eq!(replies, ["ERROR: I/O error: disk unplugged"]);
    assert!(result.is_err());

    // 另一个会话读不到半新半旧的内容
    let (replies, result) = session(&store, "READ a\nLIST\n");
    assert_eq!(replies, ["ERROR: file system halted: I/O error: disk unplugged"]);
    assert!(result.is_err());
}

#[test]
fn server_stops_accepting_after_fatal_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let disk = Arc::new(FaultyDisk::default());
    let store = Arc::new(FileStore::mount(disk.clone()).unwrap());
    let server = {
        let store = store.clone();
        thread::spawn(move || crate::run(listener, store))
    };

    assert_eq!(talk(addr, &["CREATE a"]), ["SUCCESS: File 'a' created."]);
    disk.fail_after(0);
    assert_eq!(
        talk(addr, &["WRITE a boom"]),
        ["ERROR: I/O error: disk unplugged"]
    );
    assert!(store.fault().is_some());

    // 下一个连接让服务器发现自己已停止服务
    let _late = TcpStream::connect(addr).unwrap();
    let err = server.join().unwrap().unwrap_err();
    assert!(err.to_string().contains("halted"));
}
