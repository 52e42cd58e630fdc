//! Builder for tiny single-group ext2 images with 1 KiB blocks, shared by
//! the unit tests and the integration tests.
#![allow(dead_code)]

use std::io;

use byteorder::{ByteOrder, LittleEndian};
use positioned_io2::ReadAt;

pub const BLOCK_SIZE: usize = 1024;
pub const BLOCK_BITMAP: u32 = 3;
pub const INODE_BITMAP: u32 = 4;
pub const INODE_TABLE: u32 = 5;
pub const INODE_SIZE: usize = 128;
/// First block not used by metadata
pub const FIRST_FREE_BLOCK: u32 = 9;

pub const S_IFDIR: u16 = 0x4000;
pub const S_IFREG: u16 = 0x8000;
pub const S_IFLNK: u16 = 0xa000;

/// In-memory image readable through positioned reads.
pub struct MemImage(pub Vec<u8>);

impl MemImage {
    pub fn new(data: Vec<u8>) -> MemImage {
        MemImage(data)
    }
}

impl ReadAt for MemImage {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        let pos = pos as usize;
        if pos >= self.0.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.0.len() - pos);
        buf[..n].copy_from_slice(&self.0[pos..pos + n]);
        Ok(n)
    }
}

/// Inode fields a test cares about
#[derive(Clone, Debug, Default)]
pub struct InodeSpec {
    pub mode: u16,
    pub uid: u16,
    pub gid: u16,
    pub links: u16,
    pub ctime: u32,
    pub mtime: u32,
    pub atime: u32,
    pub size: u32,
    pub sectors: u32,
    pub block: [u32; 15],
}

pub struct ImageBuilder {
    data: Vec<u8>,
    blocks: u32,
    inodes: u32,
}

impl ImageBuilder {
    /// Lays out superblock (block 1), group descriptor (block 2), bitmaps
    /// (blocks 3 and 4) and a 32 entry inode table (blocks 5 to 8).
    pub fn new(blocks: u32) -> ImageBuilder {
        let inodes = 32;
        let mut builder = ImageBuilder {
            data: vec![0_u8; blocks as usize * BLOCK_SIZE],
            blocks,
            inodes,
        };

        let sb = &mut builder.data[1024..2048];
        LittleEndian::write_u32(&mut sb[0..], inodes);
        LittleEndian::write_u32(&mut sb[4..], blocks);
        LittleEndian::write_u32(&mut sb[20..], 1);
        LittleEndian::write_u32(&mut sb[24..], 0);
        LittleEndian::write_u32(&mut sb[32..], 8192);
        LittleEndian::write_u32(&mut sb[36..], 8192);
        LittleEndian::write_u32(&mut sb[40..], inodes);
        LittleEndian::write_u16(&mut sb[56..], 0xef53);
        LittleEndian::write_u16(&mut sb[58..], 1);
        LittleEndian::write_u32(&mut sb[76..], 1);
        LittleEndian::write_u32(&mut sb[84..], 11);
        LittleEndian::write_u16(&mut sb[88..], INODE_SIZE as u16);

        let gd = &mut builder.data[2048..2080];
        LittleEndian::write_u32(&mut gd[0..], BLOCK_BITMAP);
        LittleEndian::write_u32(&mut gd[4..], INODE_BITMAP);
        LittleEndian::write_u32(&mut gd[8..], INODE_TABLE);

        for block in 1..FIRST_FREE_BLOCK {
            builder.use_block(block);
        }
        for inode in 1..11 {
            builder.use_inode(inode);
        }
        builder.refresh_counts();
        builder
    }

    fn set_bit(&mut self, bitmap: u32, index: u32) {
        let bit = (index - 1) as usize;
        self.data[bitmap as usize * BLOCK_SIZE + bit / 8] |= 1 << (bit % 8);
    }

    fn clear_bits(&self, bitmap: u32, count: u32) -> u16 {
        let base = bitmap as usize * BLOCK_SIZE;
        (0..count as usize)
            .filter(|bit| self.data[base + bit / 8] & (1 << (bit % 8)) == 0)
            .count() as u16
    }

    fn refresh_counts(&mut self) {
        let free_blocks = self.clear_bits(BLOCK_BITMAP, self.blocks);
        let free_inodes = self.clear_bits(INODE_BITMAP, self.inodes);
        LittleEndian::write_u16(&mut self.data[2048 + 12..], free_blocks);
        LittleEndian::write_u16(&mut self.data[2048 + 14..], free_inodes);
    }

    /// Marks 1-based block `block` as allocated.
    pub fn use_block(&mut self, block: u32) -> &mut ImageBuilder {
        self.set_bit(BLOCK_BITMAP, block);
        self.refresh_counts();
        self
    }

    /// Marks 1-based inode `inode` as allocated.
    pub fn use_inode(&mut self, inode: u32) -> &mut ImageBuilder {
        self.set_bit(INODE_BITMAP, inode);
        self.refresh_counts();
        self
    }

    pub fn inode(&mut self, num: u32, spec: &InodeSpec) -> &mut ImageBuilder {
        let offset = INODE_TABLE as usize * BLOCK_SIZE + (num as usize - 1) * INODE_SIZE;
        let raw = &mut self.data[offset..offset + INODE_SIZE];
        LittleEndian::write_u16(&mut raw[0..], spec.mode);
        LittleEndian::write_u16(&mut raw[2..], spec.uid);
        LittleEndian::write_u32(&mut raw[4..], spec.size);
        LittleEndian::write_u32(&mut raw[8..], spec.atime);
        LittleEndian::write_u32(&mut raw[12..], spec.ctime);
        LittleEndian::write_u32(&mut raw[16..], spec.mtime);
        LittleEndian::write_u16(&mut raw[24..], spec.gid);
        LittleEndian::write_u16(&mut raw[26..], spec.links);
        LittleEndian::write_u32(&mut raw[28..], spec.sectors);
        for (i, &block) in spec.block.iter().enumerate() {
            LittleEndian::write_u32(&mut raw[40 + 4 * i..], block);
        }
        self.use_inode(num)
    }

    /// Stores `(position, block number)` pairs in pointer block `block`.
    pub fn pointers(&mut self, block: u32, entries: &[(usize, u32)]) -> &mut ImageBuilder {
        let base = block as usize * BLOCK_SIZE;
        for &(pos, value) in entries {
            LittleEndian::write_u32(&mut self.data[base + 4 * pos..], value);
        }
        self.use_block(block)
    }

    /// Writes `(inode, rec_len, name)` directory entries back to back into
    /// `block`.
    pub fn dirents(&mut self, block: u32, entries: &[(u32, u16, &[u8])]) -> &mut ImageBuilder {
        let mut offset = block as usize * BLOCK_SIZE;
        for &(inode, rec_len, name) in entries {
            LittleEndian::write_u32(&mut self.data[offset..], inode);
            LittleEndian::write_u16(&mut self.data[offset + 4..], rec_len);
            self.data[offset + 6] = name.len() as u8;
            self.data[offset + 7] = 2;
            self.data[offset + 8..offset + 8 + name.len()].copy_from_slice(name);
            offset += rec_len as usize;
        }
        self.use_block(block)
    }

    pub fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn build(&self) -> Vec<u8> {
        self.data.clone()
    }
}
