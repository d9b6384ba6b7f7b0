//! Block allocator
//!
//! Fixed-size bitmap of storage blocks. Bit set means allocated.

use crate::error::FsError;

/// First-fit bitmap allocator over a fixed number of blocks.
#[derive(Debug, Clone, Default)]
pub struct BlockAllocator {
    bitmap: Vec<u8>,
    blocks: u32,
}

impl BlockAllocator {
    pub fn new(total_blocks: u32) -> Self {
        let bytes = (total_blocks as usize).div_ceil(8);
        Self {
            bitmap: vec![0; bytes],
            blocks: total_blocks,
        }
    }

    fn set_bit(&mut self, pos: u32) {
        if let Some(byte) = self.bitmap.get_mut((pos / 8) as usize) {
            *byte |= 1 << (pos % 8);
        }
    }

    fn clear_bit(&mut self, pos: u32) {
        if let Some(byte) = self.bitmap.get_mut((pos / 8) as usize) {
            *byte &= !(1 << (pos % 8));
        }
    }

    fn test_bit(&self, pos: u32) -> bool {
        self.bitmap
            .get((pos / 8) as usize)
            .is_some_and(|byte| byte & (1 << (pos % 8)) != 0)
    }

    /// Allocates exactly `n` blocks, scanning from block 0.
    ///
    /// On `NoSpace` the bitmap is left exactly as it was.
    pub fn allocate(&mut self, n: u32) -> Result<Vec<u32>, FsError> {
        if n == 0 {
            return Err(FsError::InvalidOperation(
                "cannot allocate zero blocks".into(),
            ));
        }

        let mut allocated = Vec::with_capacity(n as usize);
        for pos in 0..self.blocks {
            if allocated.len() == n as usize {
                break;
            }
            if !self.test_bit(pos) {
                self.set_bit(pos);
                allocated.push(pos);
            }
        }

        if allocated.len() < n as usize {
            for &pos in &allocated {
                self.clear_bit(pos);
            }
            return Err(FsError::NoSpace {
                requested: u64::from(n),
                available: allocated.len() as u64,
            });
        }

        Ok(allocated)
    }

    /// Releases the given blocks. Already-free or out-of-range indices are ignored.
    pub fn free(&mut self, blocks: &[u32]) {
        for &pos in blocks {
            if pos < self.blocks {
                self.clear_bit(pos);
            }
        }
    }

    pub fn is_allocated(&self, pos: u32) -> bool {
        pos < self.blocks && self.test_bit(pos)
    }

    /// Number of free blocks (full scan, diagnostic only).
    pub fn free_count(&self) -> u32 {
        (0..self.blocks).filter(|&pos| !self.test_bit(pos)).count() as u32
    }

    pub fn total_blocks(&self) -> u32 {
        self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_first_fit() {
        let mut bm = BlockAllocator::new(10);
        assert_eq!(bm.allocate(3).unwrap(), vec![0, 1, 2]);
        bm.free(&[1]);
        assert_eq!(bm.allocate(2).unwrap(), vec![1, 3]);
        assert_eq!(bm.free_count(), 6);
    }

    #[test]
    fn test_allocate_rolls_back_on_no_space() {
        let mut bm = BlockAllocator::new(8);
        bm.allocate(5).unwrap();
        let before = bm.free_count();

        let err = bm.allocate(4).unwrap_err();
        assert!(matches!(err, FsError::NoSpace { .. }));
        assert_eq!(bm.free_count(), before);
        assert!(!bm.is_allocated(5));
    }

    #[test]
    fn test_allocate_zero_is_invalid() {
        let mut bm = BlockAllocator::new(4);
        assert!(matches!(bm.allocate(0), Err(FsError::InvalidOperation(_))));
    }

    #[test]
    fn test_free_is_idempotent_and_ignores_out_of_range() {
        let mut bm = BlockAllocator::new(4);
        let blocks = bm.allocate(2).unwrap();
        bm.free(&blocks);
        bm.free(&blocks);
        bm.free(&[99, 1000]);
        assert_eq!(bm.free_count(), 4);
        assert_eq!(bm.total_blocks(), 4);
    }

    #[test]
    fn test_non_multiple_of_eight() {
        let mut bm = BlockAllocator::new(11);
        assert_eq!(bm.allocate(11).unwrap().len(), 11);
        assert_eq!(bm.free_count(), 0);
        assert!(bm.allocate(1).is_err());
    }
}
