//! The CSV record stream.
//!
//! One record per line, no header, in this order: `SUPERBLOCK`, `GROUP`,
//! every `BFREE`, every `IFREE`, then for each allocated inode its `INODE`
//! line, the `DIRENT` lines of its direct directory blocks, and its
//! `INDIRECT` lines with the `DIRENT` lines of indirectly reached directory
//! blocks interleaved depth first.

use std::fmt::{self, Display};
use std::io::{self, Write};

use chrono::{DateTime, Utc};
use log::debug;
use positioned_io2::ReadAt;

use crate::error::Error;
use crate::fs::bitmap::FreeIndices;
use crate::fs::dir::DirEntries;
use crate::fs::resolve::{direct_blocks, IndirectRef};
use crate::fs::Ext2;
use crate::sys::block_group::BlockGroupDescriptor;
use crate::sys::dir_entry::DirectoryEntry;
use crate::sys::inode::{FileType, Inode};
use crate::sys::superblock::Superblock;

const TIME_FORMAT: &str = "%m/%d/%y %H:%M:%S";

#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    Superblock(&'a Superblock),
    Group {
        blocks: u32,
        inodes: u32,
        descriptor: &'a BlockGroupDescriptor,
    },
    FreeBlock(u32),
    FreeInode(u32),
    Inode {
        num: u32,
        inode: &'a Inode,
    },
    DirEnt {
        parent: u32,
        offset: usize,
        entry: &'a DirectoryEntry,
    },
    Indirect {
        owner: u32,
        hop: IndirectRef,
    },
}

/// Unix seconds rendered in UTC.
struct Timestamp(u32);

impl Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match DateTime::<Utc>::from_timestamp(self.0 as i64, 0) {
            Some(time) => write!(f, "{}", time.format(TIME_FORMAT)),
            None => write!(f, "{}", self.0),
        }
    }
}

impl<'a> Display for Record<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Record::Superblock(sb) => write!(
                f,
                "SUPERBLOCK,{},{},{},{},{},{},{}",
                sb.blocks_count,
                sb.inodes_count,
                sb.block_size(),
                sb.inode_size(),
                sb.blocks_per_group,
                sb.inodes_per_group,
                sb.first_inode(),
            ),
            Record::Group {
                blocks,
                inodes,
                descriptor,
            } => write!(
                f,
                "GROUP,0,{},{},{},{},{},{},{}",
                blocks,
                inodes,
                descriptor.free_blocks_count,
                descriptor.free_inodes_count,
                descriptor.block_usage_addr,
                descriptor.inode_usage_addr,
                descriptor.inode_table_block,
            ),
            Record::FreeBlock(block) => write!(f, "BFREE,{}", block),
            Record::FreeInode(inode) => write!(f, "IFREE,{}", inode),
            Record::Inode { num, inode } => {
                let size = match inode.file_type() {
                    FileType::Regular => inode.size_low as u64 | (inode.size_high as u64) << 32,
                    _ => inode.size_low as u64,
                };
                write!(
                    f,
                    "INODE,{},{},{:o},{},{},{},{},{},{},{},{}",
                    num,
                    inode.file_type().as_char(),
                    inode.mode(),
                    inode.uid,
                    inode.gid,
                    inode.hard_links,
                    Timestamp(inode.ctime),
                    Timestamp(inode.mtime),
                    Timestamp(inode.atime),
                    size,
                    inode.sectors_count,
                )?;
                if inode.has_block_list() {
                    for block in inode.block.iter() {
                        write!(f, ",{}", block)?;
                    }
                }
                Ok(())
            }
            // lossy for names that are not UTF-8, see `write_line`
            Record::DirEnt {
                parent,
                offset,
                entry,
            } => write!(
                f,
                "DIRENT,{},{},{},{},{},'{}'",
                parent,
                offset,
                entry.inode,
                entry.rec_len,
                entry.name_len,
                String::from_utf8_lossy(&entry.name),
            ),
            Record::Indirect { owner, hop } => write!(
                f,
                "INDIRECT,{},{},{},{},{}",
                owner, hop.level, hop.logical, hop.container, hop.block,
            ),
        }
    }
}

impl<'a> Record<'a> {
    /// Writes the record as one CSV line. Directory entry names go out as
    /// the bytes stored on disk.
    pub fn write_line<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match *self {
            Record::DirEnt {
                parent,
                offset,
                entry,
            } => {
                write!(
                    out,
                    "DIRENT,{},{},{},{},{},'",
                    parent, offset, entry.inode, entry.rec_len, entry.name_len,
                )?;
                out.write_all(&entry.name)?;
                out.write_all(b"'\n")
            }
            _ => writeln!(out, "{}", self),
        }
    }
}

/// Writes the records of one image to `out`.
pub struct Dumper<'a, R, W> {
    fs: &'a Ext2<R>,
    out: W,
    records: u64,
}

impl<'a, R: ReadAt, W: Write> Dumper<'a, R, W> {
    pub fn new(fs: &'a Ext2<R>, out: W) -> Dumper<'a, R, W> {
        Dumper {
            fs,
            out,
            records: 0,
        }
    }

    fn emit(&mut self, record: Record) -> Result<(), Error> {
        self.records += 1;
        record.write_line(&mut self.out).map_err(Error::Output)
    }

    /// Emits every record in order. Records written before an error stay
    /// written.
    pub fn run(&mut self) -> Result<(), Error> {
        let fs = self.fs;
        self.emit(Record::Superblock(fs.superblock()))?;
        self.emit(Record::Group {
            blocks: fs.blocks_in_group(),
            inodes: fs.inodes_in_group(),
            descriptor: fs.group(),
        })?;

        let bitmap = fs.block_bitmap()?;
        for block in FreeIndices::new(&bitmap, fs.blocks_in_group()) {
            self.emit(Record::FreeBlock(block))?;
        }
        let bitmap = fs.inode_bitmap()?;
        for inode in FreeIndices::new(&bitmap, fs.inodes_in_group()) {
            self.emit(Record::FreeInode(inode))?;
        }

        for item in fs.inodes() {
            let (num, inode) = item?;
            self.inode(num, &inode)?;
        }
        debug!("wrote {} records", self.records);
        Ok(())
    }

    fn inode(&mut self, num: u32, inode: &Inode) -> Result<(), Error> {
        let fs = self.fs;
        let is_dir = inode.file_type() == FileType::Directory;
        self.emit(Record::Inode { num, inode })?;

        if is_dir {
            for (_, block) in direct_blocks(inode) {
                self.directory_block(num, block)?;
            }
        }

        fs.resolve(num, inode, |hop| {
            self.emit(Record::Indirect { owner: num, hop })?;
            if is_dir && hop.level == 1 {
                self.directory_block(num, hop.block)?;
            }
            Ok(())
        })
    }

    fn directory_block(&mut self, parent: u32, block: u32) -> Result<(), Error> {
        let data = self.fs.read_block(block)?;
        for entry in DirEntries::new(&data, block) {
            let (offset, entry) = entry?;
            self.emit(Record::DirEnt {
                parent,
                offset,
                entry: &entry,
            })?;
        }
        Ok(())
    }
}

/// Dumps every record of `fs` into `out`.
pub fn dump<R: ReadAt, W: Write>(fs: &Ext2<R>, out: W) -> Result<(), Error> {
    Dumper::new(fs, out).run()
}
