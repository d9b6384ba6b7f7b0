//! Server middleware
//!
//! Connection and command logging.

pub mod logging;
