//! Error types
//!
//! Defines the filesystem error taxonomy returned by every engine operation,
//! plus the top-level server error used during bootstrap.

use std::fmt;
use std::io;

/// Stable classification of a filesystem error, independent of its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    NotEmpty,
    InvalidOperation,
    InvalidPath,
    InvalidSession,
    PermissionDenied,
    NoSpace,
    Io,
    InvalidConfig,
    NotImplemented,
}

impl ErrorKind {
    /// Textual code sent to protocol clients.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "ERROR_NOT_FOUND",
            ErrorKind::AlreadyExists => "ERROR_FILE_EXISTS",
            ErrorKind::NotEmpty => "ERROR_DIRECTORY_NOT_EMPTY",
            ErrorKind::InvalidOperation => "ERROR_INVALID_OPERATION",
            ErrorKind::InvalidPath => "ERROR_INVALID_PATH",
            ErrorKind::InvalidSession => "ERROR_INVALID_SESSION",
            ErrorKind::PermissionDenied => "ERROR_PERMISSION_DENIED",
            ErrorKind::NoSpace => "ERROR_NO_SPACE",
            ErrorKind::Io => "ERROR_IO_ERROR",
            ErrorKind::InvalidConfig => "ERROR_INVALID_CONFIG",
            ErrorKind::NotImplemented => "ERROR_NOT_IMPLEMENTED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors produced by the namespace, content, identity and session layers.
#[derive(Debug)]
pub enum FsError {
    NotFound(String),
    AlreadyExists(String),
    NotEmpty(String),
    InvalidOperation(String),
    InvalidPath(String),
    InvalidSession,
    PermissionDenied(String),
    NoSpace { requested: u64, available: u64 },
    Io(io::Error),
    InvalidConfig(String),
    NotImplemented(String),
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::NotFound(_) => ErrorKind::NotFound,
            FsError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            FsError::NotEmpty(_) => ErrorKind::NotEmpty,
            FsError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            FsError::InvalidPath(_) => ErrorKind::InvalidPath,
            FsError::InvalidSession => ErrorKind::InvalidSession,
            FsError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            FsError::NoSpace { .. } => ErrorKind::NoSpace,
            FsError::Io(_) => ErrorKind::Io,
            FsError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            FsError::NotImplemented(_) => ErrorKind::NotImplemented,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound(p) => write!(f, "Not found: {}", p),
            FsError::AlreadyExists(p) => write!(f, "Already exists: {}", p),
            FsError::NotEmpty(p) => write!(f, "Directory not empty: {}", p),
            FsError::InvalidOperation(s) => write!(f, "Invalid operation: {}", s),
            FsError::InvalidPath(p) => write!(f, "Invalid path: {}", p),
            FsError::InvalidSession => write!(f, "Invalid or closed session"),
            FsError::PermissionDenied(s) => write!(f, "Permission denied: {}", s),
            FsError::NoSpace {
                requested,
                available,
            } => write!(
                f,
                "No space left: requested {} bytes, {} available",
                requested, available
            ),
            FsError::Io(e) => write!(f, "IO error: {}", e),
            FsError::InvalidConfig(s) => write!(f, "Invalid configuration: {}", s),
            FsError::NotImplemented(s) => write!(f, "Not implemented: {}", s),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(error: io::Error) -> Self {
        FsError::Io(error)
    }
}

impl From<config::ConfigError> for FsError {
    fn from(error: config::ConfigError) -> Self {
        FsError::InvalidConfig(error.to_string())
    }
}

/// General server error that encompasses bootstrap and runtime failures
#[derive(Debug)]
pub enum ServerError {
    Fs(FsError),
    Config(config::ConfigError),
    IoError(io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Fs(e) => write!(f, "Filesystem error: {}", e),
            ServerError::Config(e) => write!(f, "Configuration error: {}", e),
            ServerError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<FsError> for ServerError {
    fn from(error: FsError) -> Self {
        ServerError::Fs(error)
    }
}

impl From<config::ConfigError> for ServerError {
    fn from(error: config::ConfigError) -> Self {
        ServerError::Config(error)
    }
}

impl From<io::Error> for ServerError {
    fn from(error: io::Error) -> Self {
        ServerError::IoError(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_are_stable() {
        assert_eq!(FsError::NotFound("/x".into()).code(), "ERROR_NOT_FOUND");
        assert_eq!(
            FsError::NotEmpty("/d".into()).code(),
            "ERROR_DIRECTORY_NOT_EMPTY"
        );
        assert_eq!(FsError::InvalidSession.code(), "ERROR_INVALID_SESSION");
        assert_eq!(
            FsError::NoSpace {
                requested: 10,
                available: 2,
            }
            .kind(),
            ErrorKind::NoSpace
        );
    }

    #[test]
    fn test_io_error_converts() {
        let err: FsError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("boom"));
    }
}
