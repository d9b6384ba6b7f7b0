//! Value types returned by engine operations

use crate::storage::{Entry, EntryKind};

/// Metadata snapshot for one entry.
#[derive(Debug, Clone)]
pub struct EntryMetadata {
    pub path: String,
    pub entry: Entry,
    pub blocks_used: u64,
}

impl EntryMetadata {
    pub fn kind(&self) -> EntryKind {
        self.entry.kind
    }
}
