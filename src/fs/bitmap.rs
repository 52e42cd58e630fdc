/// Iterator over the clear bits of an allocation bitmap.
///
/// Bit `n` (least significant first within each byte) tracks resource
/// `n + 1`, so the yielded indices are 1-based and strictly ascending.
#[derive(Debug, Clone)]
pub struct FreeIndices<'a> {
    bitmap: &'a [u8],
    index: u32,
    count: u32,
}

impl<'a> FreeIndices<'a> {
    /// Scans the first `count` bits of `bitmap`. `count` is clamped to the
    /// number of bits the buffer actually holds.
    pub fn new(bitmap: &'a [u8], count: u32) -> FreeIndices<'a> {
        let bits = (bitmap.len() as u64 * 8).min(u32::MAX as u64) as u32;
        FreeIndices {
            bitmap,
            index: 1,
            count: count.min(bits),
        }
    }
}

/// Convenience wrapper around [`FreeIndices::new`].
pub fn free_indices(bitmap: &[u8], count: u32) -> FreeIndices<'_> {
    FreeIndices::new(bitmap, count)
}

impl<'a> Iterator for FreeIndices<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        while self.index <= self.count {
            let i = self.index;
            self.index += 1;
            let bit = (i - 1) as usize;
            if self.bitmap[bit / 8] & (1 << (bit % 8)) == 0 {
                return Some(i);
            }
        }
        None
    }
}
