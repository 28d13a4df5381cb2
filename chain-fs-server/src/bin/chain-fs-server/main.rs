mod cli;

use std::io;
use std::net::TcpListener;
use std::sync::Arc;

use chain_fs::{FileStore, MemDisk, TOTAL_SIZE};
use clap::Parser;
use cli::Cli;

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.total_size != TOTAL_SIZE as u64 {
        log::warn!(
            "--total-size={} ignored, the image is always {TOTAL_SIZE} bytes",
            cli.total_size
        );
    }

    let store = if cli.in_memory {
        log::info!("using an in-memory image");
        FileStore::mount(Arc::new(MemDisk::new()))
    } else {
        FileStore::open(&cli.image)
    }
    .map_err(io::Error::other)?;

    let listener = TcpListener::bind((cli.bind, cli.port))?;
    chain_fs_server::run(listener, Arc::new(store))
}
