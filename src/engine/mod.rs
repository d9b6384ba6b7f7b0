//! Filesystem engine
//!
//! The fixed operation set every client session goes through.

pub mod core;
pub mod results;

pub use self::core::{FilesystemEngine, ROOT_USER, open_or_format};
pub use results::EntryMetadata;
