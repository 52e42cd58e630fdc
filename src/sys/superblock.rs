use byteorder::{ByteOrder, LittleEndian};

use crate::error::Error;

/// Ext2 signature (0xef53), used to help confirm the presence of Ext2 on a
/// volume
pub const EXT2_MAGIC: u16 = 0xef53;

/// Byte offset of the superblock from the beginning of the volume
pub const SUPERBLOCK_OFFSET: u64 = 1024;
/// Length of the superblock record on disk
pub const SUPERBLOCK_SIZE: usize = 1024;

/// Inode size used by revision 0 file systems
pub const GOOD_OLD_INODE_SIZE: u16 = 128;
/// First non-reserved inode on revision 0 file systems
pub const GOOD_OLD_FIRST_INODE: u32 = 11;

/// Largest accepted `log_block_size` (64 KiB blocks)
const MAX_LOG_BLOCK_SIZE: u32 = 6;

/// The Superblock contains all information about the layout of the file system
/// and possibly contains other important information like what optional
/// features were used to create the file system.
///
/// The Superblock is always located at byte 1024 from the beginning of the
/// volume and is exactly 1024 bytes in length. All fields are little endian.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Superblock {
    // offsets taken from https://wiki.osdev.org/Ext2
    /// Total number of inodes in file system (offset 0)
    pub inodes_count: u32,
    /// Total number of blocks in file system (offset 4)
    pub blocks_count: u32,
    /// Number of blocks reserved for superuser (offset 8)
    pub r_blocks_count: u32,
    /// Total number of unallocated blocks (offset 12)
    pub free_blocks_count: u32,
    /// Total number of unallocated inodes (offset 16)
    pub free_inodes_count: u32,
    /// Block number of the block containing the superblock (offset 20)
    pub first_data_block: u32,
    /// log2 (block size) - 10. (In other words, the number to shift 1,024
    /// to the left by to obtain the block size) (offset 24)
    pub log_block_size: u32,
    /// Number of blocks in each block group (offset 32)
    pub blocks_per_group: u32,
    /// Number of inodes in each block group (offset 40)
    pub inodes_per_group: u32,
    /// Last mount time (in POSIX time) (offset 44)
    pub mtime: u32,
    /// Last written time (in POSIX time) (offset 48)
    pub wtime: u32,
    /// Ext2 signature (offset 56)
    pub magic: u16,
    /// File system state (offset 58)
    pub state: u16,
    /// Minor portion of version (offset 62)
    pub rev_minor: u16,
    /// Major portion of version (offset 76)
    pub rev_major: u32,
    /// First non-reserved inode in file system, as stored (offset 84)
    pub first_inode: u32,
    /// Size of each inode structure in bytes, as stored (offset 88)
    pub inode_size: u16,
    /// Optional features present (offset 92)
    pub features_opt: FeaturesOptional,
    /// Required features present (offset 96)
    pub features_req: FeaturesRequired,
    /// Features that if not supported, the volume must be mounted
    /// read-only (offset 100)
    pub features_ronly: FeaturesROnly,
    /// Required feature bits with no name in [`FeaturesRequired`] (ext4
    /// extents and friends). Their presence means block pointers may not
    /// be plain lists.
    pub features_req_unknown: u32,
    /// File system ID (offset 104)
    pub fs_id: [u8; 16],
    /// Volume name, NUL padded (offset 120)
    pub volume_name: [u8; 16],
}

impl Superblock {
    /// Decodes and validates the superblock record.
    ///
    /// `buf` must hold at least [`SUPERBLOCK_SIZE`] bytes starting at the
    /// superblock itself.
    pub fn decode(buf: &[u8]) -> Result<Superblock, Error> {
        let mut fs_id = [0_u8; 16];
        fs_id.copy_from_slice(&buf[104..120]);
        let mut volume_name = [0_u8; 16];
        volume_name.copy_from_slice(&buf[120..136]);

        let features_req = LittleEndian::read_u32(&buf[96..]);
        let superblock = Superblock {
            inodes_count: LittleEndian::read_u32(&buf[0..]),
            blocks_count: LittleEndian::read_u32(&buf[4..]),
            r_blocks_count: LittleEndian::read_u32(&buf[8..]),
            free_blocks_count: LittleEndian::read_u32(&buf[12..]),
            free_inodes_count: LittleEndian::read_u32(&buf[16..]),
            first_data_block: LittleEndian::read_u32(&buf[20..]),
            log_block_size: LittleEndian::read_u32(&buf[24..]),
            blocks_per_group: LittleEndian::read_u32(&buf[32..]),
            inodes_per_group: LittleEndian::read_u32(&buf[40..]),
            mtime: LittleEndian::read_u32(&buf[44..]),
            wtime: LittleEndian::read_u32(&buf[48..]),
            magic: LittleEndian::read_u16(&buf[56..]),
            state: LittleEndian::read_u16(&buf[58..]),
            rev_minor: LittleEndian::read_u16(&buf[62..]),
            rev_major: LittleEndian::read_u32(&buf[76..]),
            first_inode: LittleEndian::read_u32(&buf[84..]),
            inode_size: LittleEndian::read_u16(&buf[88..]),
            features_opt: FeaturesOptional::from_bits_truncate(LittleEndian::read_u32(&buf[92..])),
            features_req: FeaturesRequired::from_bits_truncate(features_req),
            features_req_unknown: features_req & !FeaturesRequired::all().bits(),
            features_ronly: FeaturesROnly::from_bits_truncate(LittleEndian::read_u32(&buf[100..])),
            fs_id,
            volume_name,
        };

        if superblock.magic != EXT2_MAGIC {
            return Err(Error::BadMagic(superblock.magic));
        }
        if superblock.log_block_size > MAX_LOG_BLOCK_SIZE {
            return Err(Error::BadBlockSize(superblock.log_block_size));
        }
        let inode_size = superblock.inode_size();
        if inode_size < GOOD_OLD_INODE_SIZE
            || !inode_size.is_power_of_two()
            || inode_size as usize > superblock.block_size()
        {
            return Err(Error::BadInodeSize(inode_size));
        }
        // one bit per inode in a single bitmap block
        if superblock.inodes_per_group as u64 > superblock.block_size() as u64 * 8 {
            return Err(Error::BadInodesPerGroup(superblock.inodes_per_group));
        }

        Ok(superblock)
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        1024 << self.log_block_size
    }

    /// Size of one inode table slot. Revision 0 images leave the stored
    /// field zero and always use 128 bytes.
    pub fn inode_size(&self) -> u16 {
        if self.rev_major == 0 {
            GOOD_OLD_INODE_SIZE
        } else {
            self.inode_size
        }
    }

    pub fn first_inode(&self) -> u32 {
        if self.rev_major == 0 {
            GOOD_OLD_FIRST_INODE
        } else {
            self.first_inode
        }
    }

    /// Number of block groups, rounded up from the block count.
    pub fn block_group_count(&self) -> u32 {
        let data_blocks = self.blocks_count.saturating_sub(self.first_data_block) as u64;
        let per_group = self.blocks_per_group as u64;
        if per_group == 0 {
            return 1;
        }
        ((data_blocks + per_group - 1) / per_group).max(1) as u32
    }

    /// Block holding the group descriptor table: the block right after the
    /// superblock, which is block 2 for 1 KiB blocks and block 1 otherwise.
    pub fn group_descriptor_block(&self) -> u32 {
        if self.block_size() > 1024 {
            1
        } else {
            2
        }
    }
}

bitflags! {
    /// Optional features
    pub struct FeaturesOptional: u32 {
        /// Preallocate some number of (contiguous?) blocks to a directory
        /// when creating a new one
        const PREALLOCATE = 0x0001;
        /// AFS server inodes exist
        const AFS = 0x0002;
        /// File system has a journal (Ext3)
        const JOURNAL = 0x0004;
        /// Inodes have extended attributes
        const EXTENDED_INODE = 0x0008;
        /// File system can resize itself for larger partitions
        const SELF_RESIZE = 0x0010;
        /// Directories use hash index
        const HASH_INDEX = 0x0020;
    }
}

bitflags! {
    /// Required features. If these are not supported; can't mount
    pub struct FeaturesRequired: u32 {
        /// Compression is used
        const REQ_COMPRESSION = 0x0001;
        /// Directory entries contain a type field
        const REQ_DIRECTORY_TYPE = 0x0002;
        /// File system needs to replay its journal
        const REQ_REPLAY_JOURNAL = 0x0004;
        /// File system uses a journal device
        const REQ_JOURNAL_DEVICE = 0x0008;
    }
}

bitflags! {
    /// ROnly features. If these are not supported; remount as read-only
    pub struct FeaturesROnly: u32 {
        /// Sparse superblocks and group descriptor tables
        const RONLY_SPARSE = 0x0001;
        /// File system uses a 64-bit file size
        const RONLY_FILE_SIZE_64 = 0x0002;
        /// Directory contents are stored in the form of a Binary Tree
        const RONLY_BTREE_DIRECTORY = 0x0004;
    }
}
