//! Shared types for patch runs: options, events, outcomes, and payload
//! metadata.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for a patch run.
#[derive(Debug, Clone)]
pub struct PatchOptions {
    /// Name of the runtime directory replaced inside the install directory
    pub runtime_dir_name: String,
    /// Name the previous runtime directory is moved to on the first run
    pub backup_dir_name: String,
    /// Progress percentage at which the one-shot milestone message fires.
    /// Values above 100 disable the milestone.
    pub milestone_percent: u8,
    /// Text carried by the milestone event
    pub milestone_message: String,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            runtime_dir_name: "oculus-runtime".to_string(),
            backup_dir_name: "oculus-runtime_old".to_string(),
            milestone_percent: 75,
            milestone_message: "Almost done...".to_string(),
        }
    }
}

/// Progress snapshot emitted after every processed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Completed percentage, floor of `entries_processed * 100 / total_entries`
    pub percent: u8,
    /// Entries processed so far, directories included
    pub entries_processed: u64,
    /// Entry total read from the archive header before the walk started
    pub total_entries: u64,
}

/// Event stream of a patch run, as observed by the foreground controller.
///
/// Exactly one `Finished` event terminates every run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PatchEvent {
    /// Progress after an entry was processed.
    Progress(ProgressUpdate),
    /// One-shot status message fired when progress first reaches the
    /// configured percentage.
    Milestone { message: String },
    /// Terminal event carrying the run's outcome.
    Finished { outcome: PatchOutcome },
}

/// Terminal outcome of a patch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PatchOutcome {
    /// Every entry was processed.
    Succeeded { stats: ExtractStats },
    /// The run stopped at an entry boundary after cancellation.
    Cancelled,
    /// The run stopped on the first error.
    Failed { message: String },
}

/// Statistics about a completed extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractStats {
    /// Total number of entries in the payload, directories included
    pub entries_total: u64,
    /// Number of files written to disk
    pub files_written: u64,
    /// Total bytes written to disk
    pub bytes_written: u64,
    /// Wall-clock duration of the extraction
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl Default for ExtractStats {
    fn default() -> Self {
        Self {
            entries_total: 0,
            files_written: 0,
            bytes_written: 0,
            duration: Duration::from_secs(0),
        }
    }
}

/// Metadata about a payload archive, read from the header without
/// extracting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadInfo {
    /// Number of entries, files and directories
    pub entry_count: u64,
    /// Number of file entries
    pub file_count: u64,
    /// Number of directory entries
    pub directory_count: u64,
    /// Sum of uncompressed file sizes in bytes
    pub total_bytes: u64,
    /// Every entry, in archive order
    pub entries: Vec<PayloadEntry>,
}

/// A single entry of the payload archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadEntry {
    /// Path of the entry within the archive
    pub path: String,
    /// Whether this entry is a directory
    pub is_directory: bool,
    /// Uncompressed size in bytes, zero for directories
    pub size: u64,
}

/// Serde support for Duration as seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_serializes_with_type_tag() {
        let event = PatchEvent::Progress(ProgressUpdate {
            percent: 33,
            entries_processed: 1,
            total_entries: 3,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["percent"], 33);
        assert_eq!(value["entriesProcessed"], 1);
        assert_eq!(value["totalEntries"], 3);
    }

    #[test]
    fn outcome_serializes_status_tag() {
        let value = serde_json::to_value(&PatchOutcome::Cancelled).unwrap();
        assert_eq!(value["status"], "cancelled");

        let failed = PatchOutcome::Failed {
            message: "disk full".to_string(),
        };
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["message"], "disk full");
    }

    #[test]
    fn default_options_match_shipped_runtime_layout() {
        let options = PatchOptions::default();
        assert_eq!(options.runtime_dir_name, "oculus-runtime");
        assert_eq!(options.backup_dir_name, "oculus-runtime_old");
        assert_eq!(options.milestone_percent, 75);
        assert_eq!(options.milestone_message, "Almost done...");
    }

    #[test]
    fn stats_round_trip_through_json() {
        let stats = ExtractStats {
            entries_total: 6,
            files_written: 4,
            bytes_written: 1024,
            duration: Duration::from_secs(2),
        };

        let json = serde_json::to_string(&stats).unwrap();
        let back: ExtractStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
