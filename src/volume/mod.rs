use std::io::ErrorKind;

use log::trace;
use positioned_io2::ReadAt;

use crate::error::Error;

/// Read-only view of an ext2 image.
///
/// Every read is positioned, so a `Volume` never depends on a shared file
/// cursor and can be borrowed by any number of readers for the whole run.
#[derive(Debug)]
pub struct Volume<R> {
    inner: R,
}

impl<R: ReadAt> Volume<R> {
    pub fn new(inner: R) -> Volume<R> {
        Volume { inner }
    }

    /// Reads exactly `length` bytes starting at byte `offset`.
    ///
    /// Short reads are retried from where they stopped until the request is
    /// satisfied. A read that returns no bytes means the image ended early.
    pub fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0_u8; length];
        let mut filled = 0;
        while filled < length {
            match self.inner.read_at(offset + filled as u64, &mut buf[filled..]) {
                Ok(0) => {
                    return Err(Error::UnexpectedEof {
                        offset,
                        length,
                        read: filled,
                    })
                }
                Ok(n) => filled += n,
                Err(ref err) if err.kind() == ErrorKind::Interrupted => {}
                Err(source) => {
                    return Err(Error::Io {
                        offset: offset + filled as u64,
                        source,
                    })
                }
            }
        }
        Ok(buf)
    }

    pub fn read_block(&self, block: u32, block_size: usize) -> Result<Vec<u8>, Error> {
        trace!("reading block {}", block);
        self.read(block as u64 * block_size as u64, block_size)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}
