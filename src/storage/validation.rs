//! Path validation
//!
//! Splits and normalizes namespace paths. Components are opaque strings:
//! only `/` is interpreted, and empty components are dropped.

use crate::error::FsError;

/// Splits an absolute path into its non-empty components.
///
/// `"/"` yields an empty list; `"/a//b/"` yields `["a", "b"]`.
pub fn split_path(path: &str) -> Result<Vec<&str>, FsError> {
    if path.is_empty() {
        return Err(FsError::InvalidPath("empty path".into()));
    }

    if !path.starts_with('/') {
        return Err(FsError::InvalidPath(format!("{} is not absolute", path)));
    }

    if path.contains('\0') {
        return Err(FsError::InvalidPath("path contains NUL byte".into()));
    }

    Ok(path.split('/').filter(|c| !c.is_empty()).collect())
}

pub fn join(components: &[&str]) -> String {
    if components.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", components.join("/"))
    }
}

/// Splits a path into its parent components and final name.
///
/// Fails with `InvalidOperation` for the root path, which has no name.
pub fn split_parent(path: &str) -> Result<(Vec<&str>, &str), FsError> {
    let mut components = split_path(path)?;
    match components.pop() {
        Some(name) => Ok((components, name)),
        None => Err(FsError::InvalidOperation(
            "the root directory cannot be the target".into(),
        )),
    }
}
