use byteorder::{ByteOrder, LittleEndian};

/// Length of the fixed part of a directory entry
pub const HEADER_SIZE: usize = 8;

/// One record of a directory's entry stream.
///
/// On disk: inode (u32), record length (u16), name length (u8), file type
/// (u8), then `name_len` name bytes. The name is not NUL terminated and the
/// record may be padded past it up to `rec_len`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub inode: u32,
    pub rec_len: u16,
    pub name_len: u8,
    pub ty: u8,
    pub name: Vec<u8>,
}

impl DirectoryEntry {
    /// Reads only the fixed header: `(inode, rec_len, name_len, ty)`.
    pub fn decode_header(buf: &[u8]) -> (u32, u16, u8, u8) {
        (
            LittleEndian::read_u32(&buf[0..]),
            LittleEndian::read_u16(&buf[4..]),
            buf[6],
            buf[7],
        )
    }

    /// `buf` must hold the header plus `name_len` bytes of name.
    pub fn decode(buf: &[u8]) -> DirectoryEntry {
        let (inode, rec_len, name_len, ty) = DirectoryEntry::decode_header(buf);
        let name = buf[HEADER_SIZE..HEADER_SIZE + name_len as usize].to_vec();
        DirectoryEntry {
            inode,
            rec_len,
            name_len,
            ty,
            name,
        }
    }
}
