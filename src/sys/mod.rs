//! Decoders for the fixed on-disk ext2 records. All of them are pure and
//! assume the buffer is at least as long as the record they read.

pub mod block_group;
pub mod dir_entry;
pub mod inode;
pub mod superblock;
