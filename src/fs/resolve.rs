//! Logical to physical block mapping through an inode's pointer array.
//!
//! The first 12 logical blocks come straight from the direct slots. After
//! that every indirect level covers `p^level` logical blocks, where `p` is
//! the number of block numbers that fit in one block (`block_size / 4`):
//!
//! | slot | level | first logical block |
//! |------|-------|---------------------|
//! | 12   | 1     | 12                  |
//! | 13   | 2     | 12 + p              |
//! | 14   | 3     | 12 + p + p^2        |
//!
//! Entry `i` of a level `n` block starts `i * p^(n-1)` logical blocks after
//! the first logical block that block covers.

use byteorder::{ByteOrder, LittleEndian};
use log::trace;
use positioned_io2::ReadAt;

use crate::error::Error;
use crate::sys::inode::{Inode, DIND_BLOCK, IND_BLOCK, N_DIRECT, TIND_BLOCK};

use super::Ext2;

/// One hop of an indirect chain: `container` (a level `level` indirect
/// block) holds `block` at the position mapping to logical block `logical`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndirectRef {
    pub level: u8,
    pub logical: u64,
    pub container: u32,
    pub block: u32,
}

/// First logical block reached through the top-level pointer of `level`.
pub fn first_logical(level: u8, per_block: u64) -> u64 {
    let direct = N_DIRECT as u64;
    match level {
        1 => direct,
        2 => direct + per_block,
        _ => direct + per_block + per_block * per_block,
    }
}

/// Allocated direct blocks as `(logical, physical)` pairs.
pub fn direct_blocks(inode: &Inode) -> impl Iterator<Item = (u64, u32)> + '_ {
    inode
        .direct()
        .iter()
        .enumerate()
        .filter(|&(_, &block)| block != 0)
        .map(|(logical, &block)| (logical as u64, block))
}

impl<R: ReadAt> Ext2<R> {
    /// Decodes every block number stored in indirect block `block`.
    pub fn read_pointers(&self, block: u32) -> Result<Vec<u32>, Error> {
        let data = self.read_block(block)?;
        let mut pointers = vec![0_u32; data.len() / 4];
        LittleEndian::read_u32_into(&data, &mut pointers);
        Ok(pointers)
    }

    /// Walks the singly, doubly and triply indirect chains of `inode`
    /// depth first, handing every non-zero entry to `visit` before
    /// descending into it.
    ///
    /// Inodes whose pointer array is not a block list (fast symlinks,
    /// devices) are not walked.
    pub fn resolve<F>(&self, num: u32, inode: &Inode, mut visit: F) -> Result<(), Error>
    where
        F: FnMut(IndirectRef) -> Result<(), Error>,
    {
        if !inode.has_block_list() {
            return Ok(());
        }

        let per_block = self.pointers_per_block();
        let mut chain = Vec::with_capacity(3);
        for &(slot, level) in &[(IND_BLOCK, 1), (DIND_BLOCK, 2), (TIND_BLOCK, 3)] {
            let top = inode.block[slot];
            if top != 0 {
                let base = first_logical(level, per_block);
                self.walk(num, top, level, base, &mut chain, &mut visit)?;
            }
        }
        Ok(())
    }

    fn walk<F>(
        &self,
        num: u32,
        block: u32,
        level: u8,
        base: u64,
        chain: &mut Vec<u32>,
        visit: &mut F,
    ) -> Result<(), Error>
    where
        F: FnMut(IndirectRef) -> Result<(), Error>,
    {
        if chain.contains(&block) {
            return Err(Error::IndirectCycle { inode: num, block });
        }
        trace!("inode {}: level {} indirect block {}", num, level, block);

        let pointers = self.read_pointers(block)?;
        let span = self.pointers_per_block().pow(level as u32 - 1);

        chain.push(block);
        for (pos, &target) in pointers.iter().enumerate() {
            if target == 0 {
                continue;
            }
            let logical = base + pos as u64 * span;
            visit(IndirectRef {
                level,
                logical,
                container: block,
                block: target,
            })?;
            if level > 1 {
                self.walk(num, target, level - 1, logical, chain, visit)?;
            }
        }
        chain.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::testing::*;

    fn file(block: [u32; 15]) -> InodeSpec {
        InodeSpec {
            mode: S_IFREG | 0o644,
            links: 1,
            block,
            ..InodeSpec::default()
        }
    }

    fn collect(image: Vec<u8>, num: u32) -> Result<Vec<IndirectRef>, Error> {
        let fs = Ext2::new(MemImage::new(image))?;
        let (_, inode) = fs
            .inodes()
            .map(|item| item.unwrap())
            .find(|&(n, _)| n == num)
            .expect("inode not allocated");
        let mut refs = Vec::new();
        fs.resolve(num, &inode, |r| {
            refs.push(r);
            Ok(())
        })?;
        Ok(refs)
    }

    fn hop(level: u8, logical: u64, container: u32, block: u32) -> IndirectRef {
        IndirectRef {
            level,
            logical,
            container,
            block,
        }
    }

    #[test]
    fn first_logical_blocks() {
        assert_eq!(first_logical(1, 256), 12);
        assert_eq!(first_logical(2, 256), 268);
        assert_eq!(first_logical(3, 256), 65_804);
        assert_eq!(first_logical(3, 1024), 12 + 1024 + 1024 * 1024);
    }

    #[test]
    fn direct_only() {
        let mut block = [0; 15];
        block[0] = 50;
        block[3] = 51;
        let mut builder = ImageBuilder::new(64);
        builder.inode(12, &file(block));
        assert!(collect(builder.build(), 12).unwrap().is_empty());

        let inode = Inode {
            block,
            ..Inode::decode(&[0; 128])
        };
        assert_eq!(
            direct_blocks(&inode).collect::<Vec<_>>(),
            vec![(0, 50), (3, 51)]
        );
    }

    #[test]
    fn all_slots_empty() {
        let mut builder = ImageBuilder::new(64);
        builder.inode(12, &file([0; 15]));
        assert!(collect(builder.build(), 12).unwrap().is_empty());
    }

    #[test]
    fn singly_indirect() {
        let mut block = [0; 15];
        block[0] = 50;
        block[IND_BLOCK] = 40;
        let mut builder = ImageBuilder::new(64);
        builder.inode(12, &file(block)).pointers(40, &[(0, 60)]);
        assert_eq!(collect(builder.build(), 12).unwrap(), vec![hop(1, 12, 40, 60)]);
    }

    #[test]
    fn doubly_indirect() {
        let mut block = [0; 15];
        block[DIND_BLOCK] = 40;
        let mut builder = ImageBuilder::new(64);
        builder
            .inode(12, &file(block))
            .pointers(40, &[(0, 41), (2, 42)])
            .pointers(41, &[(5, 50)])
            .pointers(42, &[(0, 51), (255, 52)]);
        assert_eq!(
            collect(builder.build(), 12).unwrap(),
            vec![
                hop(2, 268, 40, 41),
                hop(1, 273, 41, 50),
                hop(2, 268 + 2 * 256, 40, 42),
                hop(1, 268 + 2 * 256, 42, 51),
                hop(1, 268 + 2 * 256 + 255, 42, 52),
            ]
        );
    }

    #[test]
    fn triply_indirect() {
        let mut block = [0; 15];
        block[TIND_BLOCK] = 40;
        let mut builder = ImageBuilder::new(64);
        builder
            .inode(12, &file(block))
            .pointers(40, &[(1, 41)])
            .pointers(41, &[(2, 42)])
            .pointers(42, &[(3, 50)]);
        let base = 65_804;
        assert_eq!(
            collect(builder.build(), 12).unwrap(),
            vec![
                hop(3, base + 65_536, 40, 41),
                hop(2, base + 65_536 + 512, 41, 42),
                hop(1, base + 65_536 + 512 + 3, 42, 50),
            ]
        );
    }

    #[test]
    fn fast_symlink_is_not_walked() {
        let mut block = [0; 15];
        // target text happens to look like a pointer in slot 12
        block[IND_BLOCK] = 40;
        let mut builder = ImageBuilder::new(64);
        builder
            .inode(
                12,
                &InodeSpec {
                    mode: S_IFLNK | 0o777,
                    links: 1,
                    size: 20,
                    block,
                    ..InodeSpec::default()
                },
            )
            .pointers(40, &[(0, 60)]);
        assert!(collect(builder.build(), 12).unwrap().is_empty());
    }

    #[test]
    fn self_referencing_chain() {
        let mut block = [0; 15];
        block[DIND_BLOCK] = 40;
        let mut builder = ImageBuilder::new(64);
        builder
            .inode(12, &file(block))
            .pointers(40, &[(0, 41)])
            .pointers(41, &[(0, 41)]);
        // a level 1 block listing itself is only data, not a loop
        assert!(collect(builder.build(), 12).is_ok());

        let mut builder = ImageBuilder::new(64);
        builder
            .inode(12, &file([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 40]))
            .pointers(40, &[(0, 41)])
            .pointers(41, &[(0, 40)]);
        match collect(builder.build(), 12) {
            Err(Error::IndirectCycle { inode: 12, block: 40 }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn pointer_past_image_end() {
        let mut block = [0; 15];
        block[IND_BLOCK] = 500;
        let mut builder = ImageBuilder::new(64);
        builder.inode(12, &file(block));
        match collect(builder.build(), 12) {
            Err(Error::UnexpectedEof { offset, .. }) => assert_eq!(offset, 500 * 1024),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn triple_chain_logical_index(v in 0_usize..256, w in 0_usize..256, y in 0_usize..256) {
            let mut block = [0; 15];
            block[TIND_BLOCK] = 40;
            let mut builder = ImageBuilder::new(64);
            builder
                .inode(12, &file(block))
                .pointers(40, &[(v, 41)])
                .pointers(41, &[(w, 42)])
                .pointers(42, &[(y, 50)]);
            let refs = collect(builder.build(), 12).unwrap();

            let p = 256_u64;
            let base = 12 + p + p * p;
            let (v, w, y) = (v as u64, w as u64, y as u64);
            prop_assert_eq!(refs, vec![
                hop(3, base + v * p * p, 40, 41),
                hop(2, base + v * p * p + w * p, 41, 42),
                hop(1, base + v * p * p + w * p + y, 42, 50),
            ]);
        }
    }
}
