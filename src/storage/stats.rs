//! Aggregate filesystem counters
//!
//! Updated incrementally by every mutating operation; never rebuilt by a scan.

/// Snapshot of space and usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FsStats {
    pub total_size: u64,
    pub used_space: u64,
    pub free_space: u64,
    pub block_size: u64,
    pub allocated_blocks: u64,
    pub total_files: u32,
    pub total_directories: u32,
    pub total_users: u32,
    pub active_sessions: u32,
    /// Share of allocated block space not covered by file bytes (0.0 to 1.0)
    pub fragmentation: f64,
}

impl FsStats {
    /// Counters for a freshly formatted store; the root directory counts.
    pub fn new(total_size: u64, block_size: u64) -> Self {
        Self {
            total_size,
            free_space: total_size,
            block_size,
            total_directories: 1,
            ..Self::default()
        }
    }

    /// Moves `bytes` from free to used.
    pub(crate) fn debit(&mut self, bytes: u64) {
        self.used_space += bytes;
        self.free_space -= bytes;
    }

    /// Moves `bytes` from used back to free.
    pub(crate) fn credit(&mut self, bytes: u64) {
        self.used_space -= bytes;
        self.free_space += bytes;
    }

    pub(crate) fn resize(&mut self, old_len: u64, new_len: u64) {
        if new_len > old_len {
            self.debit(new_len - old_len);
        } else {
            self.credit(old_len - new_len);
        }
    }

    pub(crate) fn claim_blocks(&mut self, blocks: u64) {
        self.set_allocated_blocks(self.allocated_blocks + blocks);
    }

    pub(crate) fn release_blocks(&mut self, blocks: u64) {
        self.set_allocated_blocks(self.allocated_blocks - blocks);
    }

    pub(crate) fn set_allocated_blocks(&mut self, blocks: u64) {
        self.allocated_blocks = blocks;
        let allocated_bytes = blocks * self.block_size;
        self.fragmentation = if allocated_bytes == 0 {
            0.0
        } else {
            1.0 - self.used_space as f64 / allocated_bytes as f64
        };
    }

    /// `used_space + free_space == total_size`
    pub fn is_balanced(&self) -> bool {
        self.used_space + self.free_space == self.total_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_empty_and_balanced() {
        let stats = FsStats::new(4096 * 4, 4096);
        assert_eq!(stats.free_space, 16384);
        assert_eq!(stats.total_directories, 1);
        assert!(stats.is_balanced());
    }

    #[test]
    fn test_resize_keeps_balance() {
        let mut stats = FsStats::new(1000, 100);
        stats.resize(0, 130);
        stats.resize(130, 40);
        assert_eq!(stats.used_space, 40);
        assert!(stats.is_balanced());
    }

    #[test]
    fn test_fragmentation_from_counters() {
        let mut stats = FsStats::new(1000, 100);
        stats.debit(50);
        stats.set_allocated_blocks(1);
        assert!((stats.fragmentation - 0.5).abs() < f64::EPSILON);

        stats.credit(50);
        stats.set_allocated_blocks(0);
        assert_eq!(stats.fragmentation, 0.0);
    }
}
