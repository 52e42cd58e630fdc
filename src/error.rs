use std::io;

use thiserror::Error;

/// Exit status for a missing image argument
pub const EXIT_USAGE: i32 = 1;
/// Exit status when the image cannot be opened
pub const EXIT_OPEN: i32 = 1;
/// Exit status for unrecoverable read or write failures
pub const EXIT_IO: i32 = 2;
/// Exit status for on-disk structures that cannot be walked safely
pub const EXIT_CORRUPT: i32 = 3;

/// The set of all possible errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("bad superblock magic {0:#06x}")]
    BadMagic(u16),
    #[error("unsupported block size exponent {0}")]
    BadBlockSize(u32),
    #[error("invalid inode size {0}")]
    BadInodeSize(u16),
    #[error("{0} inodes per group do not fit in one inode bitmap block")]
    BadInodesPerGroup(u32),
    #[error(
        "read of {length} bytes at offset {offset} hit the end of the image after {read} bytes"
    )]
    UnexpectedEof {
        offset: u64,
        length: usize,
        read: usize,
    },
    #[error("read at offset {offset} failed: {source}")]
    Io {
        offset: u64,
        #[source]
        source: io::Error,
    },
    #[error("corrupt directory entry in block {block} at offset {offset}: {reason}")]
    CorruptDirectory {
        block: u32,
        offset: usize,
        reason: &'static str,
    },
    #[error("indirect block {block} of inode {inode} points back into its own chain")]
    IndirectCycle { inode: u32, block: u32 },
    #[error("failed to write record: {0}")]
    Output(#[source] io::Error),
}

impl Error {
    /// Process exit status the binary should use for this error
    pub fn exit_code(&self) -> i32 {
        match *self {
            Error::UnexpectedEof { .. } | Error::Io { .. } | Error::Output(_) => EXIT_IO,
            Error::BadMagic(_)
            | Error::BadBlockSize(_)
            | Error::BadInodeSize(_)
            | Error::BadInodesPerGroup(_)
            | Error::CorruptDirectory { .. }
            | Error::IndirectCycle { .. } => EXIT_CORRUPT,
        }
    }
}
