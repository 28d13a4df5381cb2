/* chain-fs 的整体架构，自上而下 */

// 文件管理层：带读写锁的对外接口
mod store;

// 文件系统层：组合目录与块链，维护各项不变式
mod cfs;

// 目录层：定长的文件项表
mod dir;

// 块链管理层：节点表与空闲位图的内存镜像，负责分配、回收与遍历
mod chain;

// 元数据编解码层：目录项、链节点以及数据块在镜像上的读写
mod codec;

// 磁盘数据结构层：目录项与链节点的原样表示
mod layout;

mod error;
mod sync;


pub use block_dev::{BlockDevice, BlockFile, MemDisk};

pub use self::{
    cfs::{ChainFileSystem, FileStat},
    error::{Error, Result},
    layout::{ChainNode, DirEntry},
    store::FileStore,
    sync::FairRwLock,
};

/// 目录项个数
pub const MAX_FILES: usize = 5;
/// 镜像中的总块数
pub const MAX_BLOCKS: usize = 10;
pub const BLOCK_SIZE: usize = 128;
/// 文件名的最大字节数
pub const NAME_MAX: usize = 11;

/// 目录项：文件名 + 大小 + 首块
pub const ENTRY_SIZE: usize = NAME_MAX + 2 + 2;
/// 链节点：自身编号 + 后继编号
pub const NODE_SIZE: usize = 2 + 2;

pub const META_BYTES: usize = MAX_FILES * ENTRY_SIZE + MAX_BLOCKS * NODE_SIZE;
/// 元数据占据的块数，这些块永远不会出现在文件的块链上
pub const META_BLOCKS: usize = META_BYTES.div_ceil(BLOCK_SIZE);

/// 镜像的字节数
pub const TOTAL_SIZE: usize = MAX_BLOCKS * BLOCK_SIZE;
/// 单个文件所能容纳的最大字节数
pub const MAX_FILE_SIZE: usize = (MAX_BLOCKS - META_BLOCKS) * BLOCK_SIZE;

/// 块链的终止标记，也表示空文件的首块
pub const NIL: i16 = -1;

/// 容纳 `size` 字节所需的块数
#[inline]
pub const fn blocks_for(size: usize) -> usize {
    size.div_ceil(BLOCK_SIZE)
}
