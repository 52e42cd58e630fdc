use crate::error::Error;
use crate::sys::dir_entry::{DirectoryEntry, HEADER_SIZE};

/// Live entries of one directory data block, paired with their byte offset
/// inside the block.
///
/// Deleted slots (inode 0) are stepped over without being yielded. The
/// stream ends once the offsets add up to the block length; any record that
/// would make the walk stall or leave the block is reported as corruption
/// and ends the iteration.
#[derive(Debug, Clone)]
pub struct DirEntries<'a> {
    data: &'a [u8],
    block: u32,
    offset: usize,
}

impl<'a> DirEntries<'a> {
    /// `data` is the full block, `block` its physical number (for errors).
    pub fn new(data: &'a [u8], block: u32) -> DirEntries<'a> {
        DirEntries {
            data,
            block,
            offset: 0,
        }
    }

    fn corrupt(&mut self, reason: &'static str) -> Option<Result<(usize, DirectoryEntry), Error>> {
        let offset = self.offset;
        self.offset = self.data.len();
        Some(Err(Error::CorruptDirectory {
            block: self.block,
            offset,
            reason,
        }))
    }
}

/// Record length as stored on disk converted to a byte count.
///
/// A 16-bit field cannot hold 65536, so blocks of 64 KiB and more store
/// 65535 (or 0) for a record spanning the whole block, and fold bits 16
/// and 17 into the two low bits, which are otherwise always zero.
pub fn rec_len_from_disk(raw: u16, block_size: usize) -> usize {
    if block_size < 65_536 {
        return raw as usize;
    }
    match raw {
        0 | 0xffff => block_size,
        _ => (raw as usize & 0xfffc) | ((raw as usize & 3) << 16),
    }
}

/// Convenience wrapper around [`DirEntries::new`].
pub fn decode_entries(data: &[u8], block: u32) -> DirEntries<'_> {
    DirEntries::new(data, block)
}

impl<'a> Iterator for DirEntries<'a> {
    type Item = Result<(usize, DirectoryEntry), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset < self.data.len() {
            let rest = &self.data[self.offset..];
            if rest.len() < HEADER_SIZE {
                return self.corrupt("truncated entry header");
            }

            let (inode, rec_len, name_len, _) = DirectoryEntry::decode_header(rest);
            let rec_len = rec_len_from_disk(rec_len, self.data.len());
            if rec_len < HEADER_SIZE {
                return self.corrupt(if rec_len == 0 {
                    "zero record length"
                } else {
                    "record length shorter than entry header"
                });
            }
            if rec_len > rest.len() {
                return self.corrupt("record runs past end of block");
            }
            if HEADER_SIZE + name_len as usize > rec_len {
                return self.corrupt("name runs past end of record");
            }

            let offset = self.offset;
            self.offset += rec_len;
            if inode != 0 {
                return Some(Ok((offset, DirectoryEntry::decode(&rest[..rec_len]))));
            }
        }
        None
    }
}
