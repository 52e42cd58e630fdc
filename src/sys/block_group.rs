use byteorder::{ByteOrder, LittleEndian};

/// Length of one block group descriptor on disk
pub const DESCRIPTOR_SIZE: usize = 32;

/// The Block Group Descriptor Table contains a descriptor for each block group
/// within the file system. Each descriptor contains information regarding
/// where important data structures for that group are located.
///
/// The table is located in the block immediately following the Superblock.
/// So if the block size is 1024 bytes per block, the Block Group Descriptor
/// Table will begin at block 2. For any other block size, it will begin at
/// block 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockGroupDescriptor {
    /// Block address of block usage bitmap (offset 0)
    pub block_usage_addr: u32,
    /// Block address of inode usage bitmap (offset 4)
    pub inode_usage_addr: u32,
    /// Starting block address of inode table (offset 8)
    pub inode_table_block: u32,
    /// Number of unallocated blocks in group (offset 12)
    pub free_blocks_count: u16,
    /// Number of unallocated inodes in group (offset 14)
    pub free_inodes_count: u16,
    /// Number of directories in group (offset 16)
    pub dirs_count: u16,
}

impl BlockGroupDescriptor {
    /// `buf` must hold at least [`DESCRIPTOR_SIZE`] bytes.
    pub fn decode(buf: &[u8]) -> BlockGroupDescriptor {
        BlockGroupDescriptor {
            block_usage_addr: LittleEndian::read_u32(&buf[0..]),
            inode_usage_addr: LittleEndian::read_u32(&buf[4..]),
            inode_table_block: LittleEndian::read_u32(&buf[8..]),
            free_blocks_count: LittleEndian::read_u16(&buf[12..]),
            free_inodes_count: LittleEndian::read_u16(&buf[14..]),
            dirs_count: LittleEndian::read_u16(&buf[16..]),
        }
    }
}
