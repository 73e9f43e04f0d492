//! # Patcher
//!
//! Core library for patching a VR runtime installation in place.
//!
//! The bundled 7z payload is unpacked over the install directory by a
//! background worker that reports floor-percent progress after every
//! archive entry and honors cooperative cancellation at entry boundaries.
//! A run-state guard keeps runs from overlapping, and every run terminates
//! with exactly one outcome: succeeded, cancelled, or failed.
//!
//! The pieces, in the order a run uses them:
//!
//! - [`payload`] - the embedded (or caller-supplied) archive and its listing
//! - [`install`] - preflight displacement of the previous runtime directory
//! - [`job`] - the run-state guard, worker spawn, and event channel
//! - [`extract`] - the extraction task itself
//!
//! ## Example
//!
//! ```rust,no_run
//! use patcher::{displace_existing_runtime, PatchEvent, PatchOptions, PatchRunner, Payload};
//! use std::path::{Path, PathBuf};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! // Move the previous runtime out of the way
//! let install_dir = PathBuf::from("/opt/oculus/Support");
//! let options = PatchOptions::default();
//! let displaced = displace_existing_runtime(&install_dir, &options)?;
//! println!("Previous runtime: {:?}", displaced);
//!
//! // Unpack the payload in the background and watch the event stream
//! let payload = Payload::from_file(Path::new("oculus-runtime.7z"))?;
//! let runner = PatchRunner::new();
//! let mut job = runner.start(payload, install_dir, options)?;
//!
//! while let Some(event) = job.recv().await {
//!     match event {
//!         PatchEvent::Progress(update) => println!("{}%", update.percent),
//!         PatchEvent::Milestone { message } => println!("{message}"),
//!         PatchEvent::Finished { outcome } => println!("{outcome:?}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extract;
pub mod install;
pub mod job;
pub mod payload;
pub mod safety;
pub mod types;

// Re-export main types
pub use error::{PatchError, SecurityError};
pub use install::{displace_existing_runtime, Displacement};
pub use job::{CancelHandle, PatchJob, PatchRunner};
pub use payload::{probe_payload, Payload};
pub use types::{
    ExtractStats, PatchEvent, PatchOptions, PatchOutcome, PayloadEntry, PayloadInfo,
    ProgressUpdate,
};

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Type alias for the event sink the extraction task reports through.
///
/// The sink receives [`PatchEvent::Progress`] after every processed entry
/// and the one-shot [`PatchEvent::Milestone`]. Delivery is fire-and-forget:
/// implementations must not block the worker thread.
pub type EventSink = dyn Fn(PatchEvent) + Send + Sync;

/// Probe a payload to list its entries without extracting.
///
/// # Arguments
///
/// * `payload` - The archive to inspect
///
/// # Returns
///
/// Returns `PayloadInfo` with entry, file, and byte counts plus the full
/// entry list in archive order.
///
/// # Errors
///
/// Returns an error if the archive header is corrupted or cannot be read.
pub fn probe(payload: &Payload) -> Result<PayloadInfo, PatchError> {
    payload::probe_payload(payload.bytes())
}

/// Extract a payload into the output directory on the calling thread.
///
/// Most callers want [`PatchRunner::start`], which runs this on a
/// background worker and turns the result into a [`PatchOutcome`].
///
/// # Arguments
///
/// * `payload` - The archive to unpack
/// * `output_dir` - Directory the entries are written under
/// * `options` - Milestone configuration
/// * `sink` - Event sink for progress and milestone events
/// * `cancel_flag` - Atomic flag polled at entry boundaries
///
/// # Returns
///
/// Returns `ExtractStats` with extraction statistics on success.
///
/// # Errors
///
/// Returns an error if:
/// - The archive is empty or corrupted
/// - An entry path fails validation
/// - The run is cancelled
/// - I/O errors occur
pub fn extract(
    payload: &Payload,
    output_dir: &Path,
    options: &PatchOptions,
    sink: &EventSink,
    cancel_flag: Arc<AtomicBool>,
) -> Result<ExtractStats, PatchError> {
    extract::extract_runtime(payload.bytes(), output_dir, options, sink, cancel_flag)
}
