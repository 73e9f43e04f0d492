//! Run orchestration: the run-state guard, the background worker, and the
//! event channel between them.

use crate::error::PatchError;
use crate::extract::extract_runtime;
use crate::payload::Payload;
use crate::types::{PatchEvent, PatchOptions, PatchOutcome};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Starts patch runs and enforces the one-run-at-a-time rule.
///
/// The guard is explicit: [`PatchRunner::start`] refuses to start while a
/// run is active, and only re-arms after that run's
/// [`PatchEvent::Finished`] has been emitted.
#[derive(Default)]
pub struct PatchRunner {
    active: Arc<AtomicBool>,
}

impl PatchRunner {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a run is currently active.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Spawns the background extraction worker for `payload`.
    ///
    /// Must be called within a Tokio runtime; the extraction itself runs on
    /// the blocking pool. Returns [`PatchError::AlreadyRunning`] while a
    /// previous run is still active.
    pub fn start(
        &self,
        payload: Payload,
        output_dir: PathBuf,
        options: PatchOptions,
    ) -> Result<PatchJob, PatchError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PatchError::AlreadyRunning);
        }

        let cancel_flag = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let worker_cancel = cancel_flag.clone();
        let active = self.active.clone();

        info!(
            payload = payload.name(),
            output = %output_dir.display(),
            "starting patch run"
        );

        let task = tokio::spawn(async move {
            let sink_tx = events_tx.clone();
            let result = tokio::task::spawn_blocking(move || {
                let sink = move |event: PatchEvent| {
                    // Fire-and-forget: a gone receiver must not stall the worker.
                    let _ = sink_tx.send(event);
                };
                extract_runtime(
                    payload.bytes(),
                    &output_dir,
                    &options,
                    &sink,
                    worker_cancel,
                )
            })
            .await;

            let outcome = match result {
                Ok(Ok(stats)) => PatchOutcome::Succeeded { stats },
                Ok(Err(PatchError::Cancelled)) => PatchOutcome::Cancelled,
                Ok(Err(e)) => PatchOutcome::Failed {
                    message: e.to_string(),
                },
                Err(join_err) => {
                    error!(error = %join_err, "extraction worker panicked");
                    PatchOutcome::Failed {
                        message: format!("extraction worker panicked: {join_err}"),
                    }
                }
            };

            let _ = events_tx.send(PatchEvent::Finished {
                outcome: outcome.clone(),
            });
            // Re-arm only after the terminal event is observable.
            active.store(false, Ordering::SeqCst);
            outcome
        });

        Ok(PatchJob {
            cancel_flag,
            events: events_rx,
            task,
        })
    }
}

/// Foreground handle to a running patch: event stream, cancellation, join.
pub struct PatchJob {
    cancel_flag: Arc<AtomicBool>,
    events: mpsc::UnboundedReceiver<PatchEvent>,
    task: JoinHandle<PatchOutcome>,
}

impl PatchJob {
    /// Receives the next event. Returns `None` once the stream is drained
    /// after the run finished.
    pub async fn recv(&mut self) -> Option<PatchEvent> {
        self.events.recv().await
    }

    /// Requests cooperative cancellation. The worker stops at the next
    /// entry boundary.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    /// A cheap clonable token for signal handlers and other threads.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: self.cancel_flag.clone(),
        }
    }

    /// Waits for the worker and returns the terminal outcome. A panicked
    /// worker surfaces as a failed outcome.
    pub async fn wait(self) -> PatchOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(join_err) => PatchOutcome::Failed {
                message: format!("patch task aborted: {join_err}"),
            },
        }
    }
}

/// Sets the cancellation flag of a single run.
#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}
