//! Safety checks for payload entry paths.
//!
//! Entry paths come straight out of the archive header and are joined onto
//! the install directory, so every one is validated and normalized before
//! any filesystem call.

use crate::error::SecurityError;
use std::path::PathBuf;

/// Validates a payload entry path and normalizes it to a relative [`PathBuf`].
///
/// Archives may carry either `/` or `\` separators depending on the tool
/// that produced them; both are treated as separators here.
///
/// Checks performed:
/// - Rejects absolute paths (leading separator or Windows drive prefix)
/// - Rejects `..` segments (path traversal)
/// - Skips empty and `.` segments
/// - Rejects names that normalize to nothing
///
/// # Examples
///
/// ```
/// use patcher::safety::validate_entry_path;
///
/// let path = validate_entry_path("runtime/bin/service.dll").unwrap();
/// assert_eq!(path, std::path::Path::new("runtime/bin/service.dll"));
///
/// assert!(validate_entry_path("../../etc/passwd").is_err());
/// assert!(validate_entry_path("/etc/passwd").is_err());
/// ```
pub fn validate_entry_path(name: &str) -> Result<PathBuf, SecurityError> {
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(SecurityError::AbsolutePath(name.to_string()));
    }

    if has_drive_prefix(name) {
        return Err(SecurityError::AbsolutePath(name.to_string()));
    }

    let mut normalized = PathBuf::new();
    for segment in name.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(SecurityError::PathTraversal(name.to_string()));
            }
            part => normalized.push(part),
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(SecurityError::PathTraversal(name.to_string()));
    }

    Ok(normalized)
}

/// Windows drive prefix check ("C:...", "d:\\...").
fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
