use byteorder::{ByteOrder, LittleEndian};

/// Length of the base inode record; larger inode slots carry extra fields
/// after it which are not decoded
pub const INODE_SIZE: usize = 128;
/// Number of entries in the block pointer array
pub const N_BLOCKS: usize = 15;
/// Number of direct block pointers
pub const N_DIRECT: usize = 12;
/// Slot of the singly indirect block pointer
pub const IND_BLOCK: usize = 12;
/// Slot of the doubly indirect block pointer
pub const DIND_BLOCK: usize = 13;
/// Slot of the triply indirect block pointer
pub const TIND_BLOCK: usize = 14;
/// Symlink targets up to this length live inside the block pointer array
pub const FAST_SYMLINK_MAX: u32 = 60;

/// An inode is a structure on the disk that represents a file, directory,
/// symbolic link, etc. Inodes do not contain the data of the file / directory /
/// etc. that they represent. Instead, they link to the blocks that actually
/// contain the data. Each block group has an array of inodes it is responsible
/// for, and inode numbers start at 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inode {
    /// Type and Permissions (offset 0)
    pub type_perm: TypePerm,
    /// User ID (offset 2)
    pub uid: u16,
    /// Lower 32 bits of size in bytes (offset 4)
    pub size_low: u32,
    /// Last Access Time (in POSIX time) (offset 8)
    pub atime: u32,
    /// Last inode change time (in POSIX time) (offset 12)
    pub ctime: u32,
    /// Last Modification time (in POSIX time) (offset 16)
    pub mtime: u32,
    /// Deletion time (in POSIX time) (offset 20)
    pub dtime: u32,
    /// Group ID (offset 24)
    pub gid: u16,
    /// Count of hard links (directory entries) to this inode. When this
    /// reaches 0, the data blocks are marked as unallocated. (offset 26)
    pub hard_links: u16,
    /// Count of disk sectors (not Ext2 blocks) in use by this inode, not
    /// counting the actual inode structure nor directory entries linking
    /// to the inode. (offset 28)
    pub sectors_count: u32,
    /// Flags (offset 32)
    pub flags: u32,
    /// Block pointers (offset 40): 12 direct, then singly, doubly and
    /// triply indirect
    pub block: [u32; N_BLOCKS],
    /// Generation number (offset 100)
    pub gen_number: u32,
    /// Upper 32 bits of file size for regular files (offset 108)
    pub size_high: u32,
}

impl Inode {
    /// `buf` must hold at least [`INODE_SIZE`] bytes.
    pub fn decode(buf: &[u8]) -> Inode {
        let mut block = [0_u32; N_BLOCKS];
        LittleEndian::read_u32_into(&buf[40..40 + 4 * N_BLOCKS], &mut block);

        Inode {
            type_perm: TypePerm::from_bits_truncate(LittleEndian::read_u16(&buf[0..])),
            uid: LittleEndian::read_u16(&buf[2..]),
            size_low: LittleEndian::read_u32(&buf[4..]),
            atime: LittleEndian::read_u32(&buf[8..]),
            ctime: LittleEndian::read_u32(&buf[12..]),
            mtime: LittleEndian::read_u32(&buf[16..]),
            dtime: LittleEndian::read_u32(&buf[20..]),
            gid: LittleEndian::read_u16(&buf[24..]),
            hard_links: LittleEndian::read_u16(&buf[26..]),
            sectors_count: LittleEndian::read_u32(&buf[28..]),
            flags: LittleEndian::read_u32(&buf[32..]),
            block,
            gen_number: LittleEndian::read_u32(&buf[100..]),
            size_high: LittleEndian::read_u32(&buf[108..]),
        }
    }

    /// Free slots have no links or a zeroed mode.
    pub fn in_use(&self) -> bool {
        self.hard_links > 0 && !self.type_perm.is_empty()
    }

    pub fn file_type(&self) -> FileType {
        self.type_perm.file_type()
    }

    /// Permission bits, including setuid, setgid and sticky
    pub fn mode(&self) -> u16 {
        self.type_perm.bits() & 0o7777
    }

    pub fn direct(&self) -> &[u32] {
        &self.block[..N_DIRECT]
    }

    /// Whether the pointer array holds block numbers rather than an inline
    /// symlink target.
    pub fn has_block_list(&self) -> bool {
        match self.file_type() {
            FileType::Directory | FileType::Regular => true,
            FileType::Symlink => self.size_low > FAST_SYMLINK_MAX,
            FileType::Other => false,
        }
    }
}

/// The kind of object an inode describes, as far as the dump cares
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileType {
    Directory,
    Regular,
    Symlink,
    Other,
}

impl FileType {
    pub fn as_char(self) -> char {
        match self {
            FileType::Directory => 'd',
            FileType::Regular => 'f',
            FileType::Symlink => 's',
            FileType::Other => '?',
        }
    }
}

bitflags! {
    pub struct TypePerm: u16 {
        /// FIFO
        const FIFO = 0x1000;
        /// Character device
        const CHAR_DEVICE = 0x2000;
        /// Directory
        const DIRECTORY = 0x4000;
        /// Block device
        const BLOCK_DEVICE = 0x6000;
        /// Regular file
        const FILE = 0x8000;
        /// Symbolic link
        const SYMLINK = 0xA000;
        /// Unix socket
        const SOCKET = 0xC000;
        /// Other execute permission
        const O_EXEC = 0x001;
        /// Other write permission
        const O_WRITE = 0x002;
        /// Other read permission
        const O_READ = 0x004;
        /// Group execute permission
        const G_EXEC = 0x008;
        /// Group write permission
        const G_WRITE = 0x010;
        /// Group read permission
        const G_READ = 0x020;
        /// User execute permission
        const U_EXEC = 0x040;
        /// User write permission
        const U_WRITE = 0x080;
        /// User read permission
        const U_READ = 0x100;
        /// Sticky Bit
        const STICKY = 0x200;
        /// Set group ID
        const SET_GID = 0x400;
        /// Set user ID
        const SET_UID = 0x800;
    }
}

impl TypePerm {
    /// The type values overlap as bit patterns (a socket "contains" a
    /// directory), so the whole top nibble has to be compared.
    pub fn file_type(self) -> FileType {
        match self.bits() & 0xf000 {
            x if x == TypePerm::DIRECTORY.bits() => FileType::Directory,
            x if x == TypePerm::FILE.bits() => FileType::Regular,
            x if x == TypePerm::SYMLINK.bits() => FileType::Symlink,
            _ => FileType::Other,
        }
    }
}
