//! Error types for runtime patching operations.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for patch operations.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The install directory does not exist.
    #[error("Install directory not found: {0}")]
    InstallDirMissing(PathBuf),

    /// The payload archive could not be opened or decoded.
    #[error("Payload archive unreadable: {0}")]
    Archive(#[from] sevenz_rust2::Error),

    /// The payload archive contains no entries.
    #[error("Payload archive is empty")]
    EmptyPayload,

    /// A security violation was detected in an entry path.
    #[error("Security violation: {0}")]
    Security(#[from] SecurityError),

    /// An I/O error occurred while writing the output tree.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A patch run is already in progress.
    #[error("A patch run is already in progress")]
    AlreadyRunning,

    /// The run was cancelled by the caller.
    #[error("Cancelled by user")]
    Cancelled,
}

/// Security-related errors for payload entry paths.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Path traversal attempt detected (e.g., "../../../etc/passwd").
    #[error("Path traversal attempt: {0}")]
    PathTraversal(String),

    /// Absolute path not allowed in archive entries.
    #[error("Absolute path not allowed: {0}")]
    AbsolutePath(String),
}
