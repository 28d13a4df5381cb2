use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// TCP port to listen on
    #[arg(long, short, default_value_t = 12345)]
    pub port: u16,

    /// Address to bind
    #[arg(long, short, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Backing image file, created and formatted if empty
    #[arg(long, short, default_value = "filesystem.dat")]
    pub image: PathBuf,

    /// Expected image size in bytes (informational, the layout is fixed)
    #[arg(long, default_value_t = chain_fs::TOTAL_SIZE as u64)]
    pub total_size: u64,

    /// Keep the image in memory instead of a file
    #[arg(long)]
    pub in_memory: bool,
}
