//! Install-directory preflight: moving the previous runtime out of the way.
//!
//! Runs on the controlling thread before the extraction task starts. The
//! first patch run keeps the original runtime under the backup name; later
//! runs find the backup already present and delete the runtime tree that is
//! about to be replaced.

use crate::error::PatchError;
use crate::types::PatchOptions;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// What the preflight did with the existing runtime directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Displacement {
    /// The runtime directory was renamed to the backup name.
    BackedUp,
    /// A backup already existed; the runtime directory was deleted.
    Removed,
    /// No runtime directory was present.
    NotPresent,
}

/// Moves the existing runtime directory out of the install directory.
///
/// - runtime present, no backup: rename runtime to the backup name
/// - runtime and backup both present: delete the runtime tree, keeping the
///   backup from the earlier run
/// - runtime absent: nothing to do
///
/// The install directory itself must already exist. No rollback: a partial
/// failure here leaves whatever the filesystem call completed.
pub fn displace_existing_runtime(
    install_dir: &Path,
    options: &PatchOptions,
) -> Result<Displacement, PatchError> {
    if !install_dir.is_dir() {
        return Err(PatchError::InstallDirMissing(install_dir.to_path_buf()));
    }

    let runtime = install_dir.join(&options.runtime_dir_name);
    let backup = install_dir.join(&options.backup_dir_name);

    if runtime.is_dir() && backup.is_dir() {
        info!(runtime = %runtime.display(), "backup already present, removing runtime tree");
        fs::remove_dir_all(&runtime)?;
        return Ok(Displacement::Removed);
    }

    if runtime.is_dir() {
        info!(
            from = %runtime.display(),
            to = %backup.display(),
            "backing up runtime directory"
        );
        fs::rename(&runtime, &backup)?;
        return Ok(Displacement::BackedUp);
    }

    warn!(runtime = %runtime.display(), "no runtime directory to displace");
    Ok(Displacement::NotPresent)
}
