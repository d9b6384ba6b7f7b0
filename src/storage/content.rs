//! Content store
//!
//! File payloads keyed by namespace entry id. Every size change goes through
//! the block allocator and the byte counters in one step, so the two views of
//! used space cannot drift apart.

use std::collections::HashMap;

use crate::error::FsError;
use crate::storage::bitmap::BlockAllocator;
use crate::storage::namespace::EntryId;
use crate::storage::stats::FsStats;

/// Payload and accounting for one file.
#[derive(Debug, Clone, Default)]
pub struct ContentRecord {
    pub payload: Vec<u8>,
    pub actual_size: u64,
    pub blocks_used: u64,
    blocks: Vec<u32>,
}

#[derive(Debug)]
pub struct ContentStore {
    records: HashMap<EntryId, ContentRecord>,
    allocator: BlockAllocator,
    block_size: u64,
}

impl ContentStore {
    pub fn new(total_blocks: u32, block_size: u64) -> Self {
        Self {
            records: HashMap::new(),
            allocator: BlockAllocator::new(total_blocks),
            block_size,
        }
    }

    pub fn allocator(&self) -> &BlockAllocator {
        &self.allocator
    }

    pub fn get(&self, id: EntryId) -> Option<&ContentRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn blocks_for(&self, len: u64) -> u64 {
        len.div_ceil(self.block_size)
    }

    fn to_len(len: u64) -> Result<usize, FsError> {
        usize::try_from(len)
            .map_err(|_| FsError::InvalidOperation("length overflow".into()))
    }

    /// Checks byte space and claims any extra blocks needed to grow from
    /// `old_len` to `new_len`. Nothing is claimed on failure.
    fn reserve(
        &mut self,
        old_len: u64,
        new_len: u64,
        stats: &FsStats,
    ) -> Result<Vec<u32>, FsError> {
        if new_len <= old_len {
            return Ok(Vec::new());
        }

        let growth = new_len - old_len;
        let no_space = || FsError::NoSpace {
            requested: growth,
            available: stats.free_space,
        };
        if growth > stats.free_space {
            return Err(no_space());
        }

        let extra = self.blocks_for(new_len) - self.blocks_for(old_len);
        if extra == 0 {
            return Ok(Vec::new());
        }

        let extra = u32::try_from(extra).map_err(|_| no_space())?;
        self.allocator.allocate(extra).map_err(|_| no_space())
    }

    /// Stores the initial payload of a newly created file.
    pub fn write(&mut self, id: EntryId, bytes: &[u8], stats: &mut FsStats) -> Result<(), FsError> {
        if self.records.contains_key(&id) {
            return Err(FsError::AlreadyExists(format!(
                "content for entry {}",
                id.as_u64()
            )));
        }

        let len = bytes.len() as u64;
        let blocks = self.reserve(0, len, stats)?;
        let blocks_used = blocks.len() as u64;

        self.records.insert(
            id,
            ContentRecord {
                payload: bytes.to_vec(),
                actual_size: len,
                blocks_used,
                blocks,
            },
        );

        stats.debit(len);
        stats.total_files += 1;
        stats.claim_blocks(blocks_used);
        Ok(())
    }

    /// Writes `bytes` at `offset`, zero-filling any gap past the current end.
    /// Returns the new length.
    pub fn edit(
        &mut self,
        id: EntryId,
        bytes: &[u8],
        offset: u64,
        stats: &mut FsStats,
    ) -> Result<u64, FsError> {
        let old_len = self
            .records
            .get(&id)
            .map(|r| r.actual_size)
            .ok_or_else(|| missing(id))?;

        let end = offset
            .checked_add(bytes.len() as u64)
            .ok_or_else(|| FsError::InvalidOperation("offset overflow".into()))?;
        let new_len = old_len.max(end);

        let extra_blocks = self.reserve(old_len, new_len, stats)?;
        let (start, stop) = match (Self::to_len(offset), Self::to_len(end)) {
            (Ok(start), Ok(stop)) => (start, stop),
            (Err(e), _) | (_, Err(e)) => {
                self.allocator.free(&extra_blocks);
                return Err(e);
            }
        };

        let added_blocks = extra_blocks.len() as u64;
        let Some(record) = self.records.get_mut(&id) else {
            self.allocator.free(&extra_blocks);
            return Err(missing(id));
        };

        if record.payload.len() < stop {
            record.payload.resize(stop, 0);
        }
        record.payload[start..stop].copy_from_slice(bytes);
        record.blocks.extend(extra_blocks);
        record.actual_size = new_len;
        record.blocks_used = record.blocks.len() as u64;

        stats.resize(old_len, new_len);
        stats.claim_blocks(added_blocks);
        Ok(new_len)
    }

    /// Empties a file and returns all its space.
    pub fn truncate(&mut self, id: EntryId, stats: &mut FsStats) -> Result<(), FsError> {
        let record = self.records.get_mut(&id).ok_or_else(|| missing(id))?;

        let old_len = record.actual_size;
        let released = std::mem::take(&mut record.blocks);
        record.payload.clear();
        record.actual_size = 0;
        record.blocks_used = 0;

        self.allocator.free(&released);
        stats.credit(old_len);
        stats.release_blocks(released.len() as u64);
        Ok(())
    }

    /// Copy of the payload; the caller never sees internal storage.
    pub fn read(&self, id: EntryId) -> Result<Vec<u8>, FsError> {
        self.records
            .get(&id)
            .map(|r| r.payload.clone())
            .ok_or_else(|| missing(id))
    }

    /// Drops a file's payload, crediting its whole size.
    pub fn delete(&mut self, id: EntryId, stats: &mut FsStats) -> Result<u64, FsError> {
        let record = self.records.remove(&id).ok_or_else(|| missing(id))?;

        self.allocator.free(&record.blocks);
        stats.credit(record.actual_size);
        stats.total_files -= 1;
        stats.release_blocks(record.blocks_used);
        Ok(record.actual_size)
    }
}

fn missing(id: EntryId) -> FsError {
    FsError::NotFound(format!("content for entry {}", id.as_u64()))
}
