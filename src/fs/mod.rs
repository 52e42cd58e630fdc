use log::{debug, trace, warn};
use positioned_io2::ReadAt;

use crate::error::Error;
use crate::sys::block_group::{BlockGroupDescriptor, DESCRIPTOR_SIZE};
use crate::sys::inode::{Inode, INODE_SIZE};
use crate::sys::superblock::{Superblock, SUPERBLOCK_OFFSET, SUPERBLOCK_SIZE};
use crate::volume::Volume;

pub mod bitmap;
pub mod dir;
pub mod resolve;

/// An opened ext2 image: the volume plus the records every later step
/// needs. Only block group 0 is examined.
#[derive(Debug)]
pub struct Ext2<R> {
    volume: Volume<R>,
    superblock: Superblock,
    group: BlockGroupDescriptor,
}

impl<R: ReadAt> Ext2<R> {
    pub fn new(inner: R) -> Result<Ext2<R>, Error> {
        let volume = Volume::new(inner);
        let superblock =
            Superblock::decode(&volume.read(SUPERBLOCK_OFFSET, SUPERBLOCK_SIZE)?)?;
        debug!(
            "superblock: {} blocks of {} bytes, {} inodes of {} bytes, revision {}.{}",
            superblock.blocks_count,
            superblock.block_size(),
            superblock.inodes_count,
            superblock.inode_size(),
            superblock.rev_major,
            superblock.rev_minor,
        );

        if superblock.features_req_unknown != 0 {
            warn!(
                "image uses unsupported required features {:#x}; block lists may be misread",
                superblock.features_req_unknown
            );
        }
        let groups = superblock.block_group_count();
        if groups > 1 {
            warn!("image has {} block groups, only group 0 is dumped", groups);
        }

        let offset = superblock.group_descriptor_block() as u64 * superblock.block_size() as u64;
        let group = BlockGroupDescriptor::decode(&volume.read(offset, DESCRIPTOR_SIZE)?);
        debug!("group 0: {:?}", group);

        Ok(Ext2 {
            volume,
            superblock,
            group,
        })
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn group(&self) -> &BlockGroupDescriptor {
        &self.group
    }

    pub fn block_size(&self) -> usize {
        self.superblock.block_size()
    }

    /// Number of 32-bit block numbers an indirect block holds
    pub fn pointers_per_block(&self) -> u64 {
        self.block_size() as u64 / 4
    }

    pub fn blocks_in_group(&self) -> u32 {
        self.superblock
            .blocks_count
            .min(self.superblock.blocks_per_group)
    }

    pub fn inodes_in_group(&self) -> u32 {
        self.superblock
            .inodes_count
            .min(self.superblock.inodes_per_group)
    }

    pub fn read_block(&self, block: u32) -> Result<Vec<u8>, Error> {
        self.volume.read_block(block, self.block_size())
    }

    pub fn block_bitmap(&self) -> Result<Vec<u8>, Error> {
        self.read_block(self.group.block_usage_addr)
    }

    pub fn inode_bitmap(&self) -> Result<Vec<u8>, Error> {
        self.read_block(self.group.inode_usage_addr)
    }

    /// Allocated inodes of the group 0 inode table. The table is read one
    /// block at a time as the iterator advances.
    pub fn inodes(&self) -> Inodes<'_, R> {
        let inode_size = self.superblock.inode_size() as usize;
        Inodes {
            fs: self,
            block: Vec::new(),
            inode_size,
            per_block: (self.block_size() / inode_size) as u32,
            index: 0,
            count: self.inodes_in_group(),
        }
    }
}

/// Allocated inodes of an inode table in ascending inode number order.
///
/// A failed table read is yielded once and ends the iteration.
#[derive(Debug)]
pub struct Inodes<'a, R> {
    fs: &'a Ext2<R>,
    block: Vec<u8>,
    inode_size: usize,
    per_block: u32,
    index: u32,
    count: u32,
}

impl<'a, R: ReadAt> Iterator for Inodes<'a, R> {
    type Item = Result<(u32, Inode), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.count {
            let slot = self.index % self.per_block;
            if slot == 0 {
                let table = self.fs.group.inode_table_block;
                let block = table.saturating_add(self.index / self.per_block);
                match self.fs.read_block(block) {
                    Ok(data) => self.block = data,
                    Err(err) => {
                        self.index = self.count;
                        return Some(Err(err));
                    }
                }
            }

            let offset = slot as usize * self.inode_size;
            self.index += 1;
            let inode = Inode::decode(&self.block[offset..offset + INODE_SIZE]);
            if inode.in_use() {
                trace!("inode {} in use: {:?}", self.index, inode.file_type());
                return Some(Ok((self.index, inode)));
            }
        }
        None
    }
}
