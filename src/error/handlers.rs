//! Error handlers
//!
//! Maps errors to the textual codes clients see and logs them.

use crate::error::types::{FsError, ServerError};
use log::{error, warn};

/// Code reported for faults that have no filesystem error kind.
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// Handle a server-level error
pub fn handle_error(err: &ServerError) {
    error!("OmniFS Server Error: {} ({})", err, error_to_code(err));
}

/// Log a rejected engine operation and return the code to send back.
pub fn report_fs_error(client: &str, operation: &str, err: &FsError) -> &'static str {
    warn!("Client {} {} failed: {}", client, operation, err);
    err.code()
}

/// Convert a server error to a protocol code
pub fn error_to_code(err: &ServerError) -> &'static str {
    match err {
        ServerError::Fs(e) => e.code(),
        ServerError::Config(_) => "ERROR_INVALID_CONFIG",
        ServerError::IoError(_) => UNKNOWN_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_to_code() {
        let err = ServerError::Fs(FsError::PermissionDenied("x".into()));
        assert_eq!(error_to_code(&err), "ERROR_PERMISSION_DENIED");

        let err = ServerError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "x"));
        assert_eq!(error_to_code(&err), UNKNOWN_ERROR);
    }
}
