//! Server core functionality
//!
//! The TCP listener and its per-connection task spawning.

pub mod core;

pub use self::core::Server;
