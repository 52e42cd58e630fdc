//! Read-only ext2 inspection: decodes the superblock, group 0 descriptor,
//! allocation bitmaps, inode table, directory entries and indirect block
//! chains of an image and emits them as CSV records.

#[macro_use]
extern crate bitflags;

pub mod dump;
pub mod error;
pub mod fs;
pub mod sys;
pub mod volume;

pub use dump::{dump, Dumper, Record};
pub use error::Error;
pub use fs::Ext2;

#[cfg(test)]
#[path = "../tests/common/image.rs"]
pub(crate) mod testing;
