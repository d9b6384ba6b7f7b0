//! Namespace and storage engine internals
//!
//! Path validation, the namespace tree, file content with block accounting,
//! and the store header.

pub mod bitmap;
pub mod content;
pub mod header;
pub mod namespace;
pub mod permissions;
pub mod stats;
pub mod validation;

pub use bitmap::BlockAllocator;
pub use content::{ContentRecord, ContentStore};
pub use header::{StoreHeader, format, read_header};
pub use namespace::{Entry, EntryId, EntryKind, Namespace, ROOT_ID};
pub use stats::FsStats;
