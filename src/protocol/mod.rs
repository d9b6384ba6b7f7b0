//! OmniFS line protocol
//!
//! Handles command parsing, dispatch onto the engine, and response formatting.

pub mod commands;
pub mod handlers;
pub mod responses;

pub use commands::{Command, CommandResult, CommandStatus, PendingUpload, parse_command};
pub use handlers::{complete_upload, handle_command};
