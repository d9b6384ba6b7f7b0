//! Utility functions
//!
//! Small helpers shared across modules.

pub mod time;
