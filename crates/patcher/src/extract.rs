//! Payload extraction: the body of the background patch task.
//!
//! Walks the archive entry by entry, writing file entries under the output
//! directory and reporting floor-percent progress after every entry. The
//! cancellation flag is polled at entry boundaries only; an in-flight write
//! is never interrupted.

use crate::error::PatchError;
use crate::payload::probe_payload;
use crate::safety::validate_entry_path;
use crate::types::{ExtractStats, PatchEvent, PatchOptions, ProgressUpdate};
use crate::EventSink;
use sevenz_rust2::SevenZArchiveEntry;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Extracts every entry of `archive` into `output_dir`.
///
/// Per entry, in archive order:
/// - a set cancellation flag stops the walk before the entry is touched
/// - directory entries write nothing but still count toward progress
/// - file entries land at `output_dir/<entry path>`, parent directories
///   created as needed, colliding files overwritten
/// - a [`PatchEvent::Progress`] is emitted with
///   `percent = floor(processed * 100 / total)`
/// - the one-shot [`PatchEvent::Milestone`] fires when percent first
///   reaches `options.milestone_percent`
///
/// The entry total is read from the archive header before the walk begins
/// and is never recomputed. A cancelled run returns
/// [`PatchError::Cancelled`]; entries already written stay in place on both
/// cancellation and failure.
pub fn extract_runtime(
    archive: &[u8],
    output_dir: &Path,
    options: &PatchOptions,
    sink: &EventSink,
    cancel_flag: Arc<AtomicBool>,
) -> Result<ExtractStats, PatchError> {
    let start_time = Instant::now();

    let total = probe_payload(archive)?.entry_count;
    if total == 0 {
        return Err(PatchError::EmptyPayload);
    }

    fs::create_dir_all(output_dir)?;

    info!(
        total_entries = total,
        output = %output_dir.display(),
        "starting extraction"
    );

    let mut stats = ExtractStats {
        entries_total: total,
        ..ExtractStats::default()
    };

    let mut processed: u64 = 0;
    let mut milestone_fired = false;
    // First write or validation failure; the walk stops and the error is
    // rethrown once the decoder returns.
    let mut failure: Option<PatchError> = None;

    let mut extract_fn = |entry: &SevenZArchiveEntry,
                          reader: &mut dyn Read,
                          _dest: &PathBuf|
     -> Result<bool, sevenz_rust2::Error> {
        if cancel_flag.load(Ordering::Relaxed) {
            return Ok(false);
        }

        if !entry.is_directory {
            match write_entry(output_dir, &entry.name, reader) {
                Ok(bytes) => {
                    stats.files_written += 1;
                    stats.bytes_written += bytes;
                }
                Err(e) => {
                    failure = Some(e);
                    return Ok(false);
                }
            }
        }

        processed += 1;
        let percent = ((processed * 100) / total) as u8;
        debug!(entry = %entry.name, percent, "entry processed");

        sink(PatchEvent::Progress(ProgressUpdate {
            percent,
            entries_processed: processed,
            total_entries: total,
        }));

        if !milestone_fired && percent >= options.milestone_percent {
            milestone_fired = true;
            sink(PatchEvent::Milestone {
                message: options.milestone_message.clone(),
            });
        }

        Ok(true)
    };

    sevenz_rust2::decompress_with_extract_fn(
        io::Cursor::new(archive),
        output_dir,
        &mut extract_fn,
    )?;

    if cancel_flag.load(Ordering::Relaxed) {
        info!(entries_processed = processed, "extraction cancelled");
        return Err(PatchError::Cancelled);
    }

    if let Some(err) = failure {
        return Err(err);
    }

    stats.duration = start_time.elapsed();
    info!(
        files = stats.files_written,
        bytes = stats.bytes_written,
        "extraction finished"
    );

    Ok(stats)
}

/// Writes one file entry under the output root, creating parent directories
/// as needed. Returns the number of bytes written.
fn write_entry(output_dir: &Path, entry_name: &str, reader: &mut dyn Read) -> Result<u64, PatchError> {
    let relative = validate_entry_path(entry_name)?;
    let dest = output_dir.join(relative);

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    // File::create truncates, so colliding paths are overwritten.
    let mut file = File::create(&dest)?;
    let bytes = io::copy(reader, &mut file)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_entry_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let mut content: &[u8] = b"runtime bits";

        let bytes = write_entry(temp.path(), "bin/drivers/ovr.dll", &mut content).unwrap();

        assert_eq!(bytes, 12);
        let written = fs::read(temp.path().join("bin/drivers/ovr.dll")).unwrap();
        assert_eq!(written, b"runtime bits");
    }

    #[test]
    fn write_entry_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("service.dll"), b"old version, much longer").unwrap();

        let mut content: &[u8] = b"new";
        write_entry(temp.path(), "service.dll", &mut content).unwrap();

        let written = fs::read(temp.path().join("service.dll")).unwrap();
        assert_eq!(written, b"new");
    }

    #[test]
    fn write_entry_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let mut content: &[u8] = b"evil";

        match write_entry(temp.path(), "../outside.txt", &mut content) {
            Err(PatchError::Security(_)) => {}
            other => panic!("Expected Security error, got: {:?}", other),
        }
        assert!(!temp.path().join("../outside.txt").exists());
    }
}
