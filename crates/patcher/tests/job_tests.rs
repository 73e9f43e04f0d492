use patcher::{PatchError, PatchEvent, PatchOptions, PatchOutcome, PatchRunner, Payload};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to build a small 7z payload under `work_dir`
fn create_test_payload(work_dir: &Path, label: &str) -> Payload {
    let staging = work_dir.join(format!("staging-{label}"));
    fs::create_dir_all(staging.join("bin")).unwrap();
    fs::write(staging.join("bin/service.dll"), b"runtime service").unwrap();
    fs::write(staging.join("manifest.json"), b"{\"version\": 66}").unwrap();

    let archive_path = work_dir.join(format!("payload-{label}.7z"));
    sevenz_rust2::compress_to_path(&staging, &archive_path).unwrap();
    Payload::from_file(&archive_path).unwrap()
}

/// Regular files under `root`, recursively
fn files_under(root: &Path) -> Vec<std::path::PathBuf> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

#[tokio::test]
async fn test_start_while_active_is_rejected() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("output");
    let runner = PatchRunner::new();

    let job = runner
        .start(
            create_test_payload(temp.path(), "first"),
            output.clone(),
            PatchOptions::default(),
        )
        .unwrap();
    assert!(runner.is_active());

    // The worker has not been polled yet, so the guard is still held
    let denied = runner.start(
        create_test_payload(temp.path(), "second"),
        output.clone(),
        PatchOptions::default(),
    );
    match denied {
        Err(PatchError::AlreadyRunning) => {}
        Ok(_) => panic!("Expected AlreadyRunning, got a second job"),
        Err(e) => panic!("Expected AlreadyRunning, got: {:?}", e),
    }

    let outcome = job.wait().await;
    assert!(matches!(outcome, PatchOutcome::Succeeded { .. }));

    // The guard re-arms once the run has finished
    assert!(!runner.is_active());
    let job = runner
        .start(
            create_test_payload(temp.path(), "third"),
            output,
            PatchOptions::default(),
        )
        .unwrap();
    let outcome = job.wait().await;
    assert!(matches!(outcome, PatchOutcome::Succeeded { .. }));
}

#[tokio::test]
async fn test_event_stream_ends_with_single_finished() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("output");
    let runner = PatchRunner::new();

    let mut job = runner
        .start(
            create_test_payload(temp.path(), "events"),
            output,
            PatchOptions::default(),
        )
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = job.recv().await {
        events.push(event);
    }

    let finished_count = events
        .iter()
        .filter(|event| matches!(event, PatchEvent::Finished { .. }))
        .count();
    assert_eq!(finished_count, 1);
    assert!(
        matches!(events.last(), Some(PatchEvent::Finished { .. })),
        "the terminal event must close the stream"
    );

    match events.last() {
        Some(PatchEvent::Finished {
            outcome: PatchOutcome::Succeeded { stats },
        }) => {
            assert_eq!(stats.files_written, 2);
            assert!(stats.bytes_written > 0);
        }
        other => panic!("Expected a succeeded outcome, got: {:?}", other),
    }

    // Progress reached 100 before the terminal event
    let last_percent = events
        .iter()
        .filter_map(|event| match event {
            PatchEvent::Progress(update) => Some(update.percent),
            _ => None,
        })
        .last();
    assert_eq!(last_percent, Some(100));
}

#[tokio::test]
async fn test_cancel_before_worker_runs() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("output");
    let runner = PatchRunner::new();

    let job = runner
        .start(
            create_test_payload(temp.path(), "cancel"),
            output.clone(),
            PatchOptions::default(),
        )
        .unwrap();

    // The worker is not polled until the first await, so it observes the
    // flag at its first entry boundary and writes nothing
    job.cancel();

    let outcome = job.wait().await;
    assert!(matches!(outcome, PatchOutcome::Cancelled));
    assert!(!runner.is_active());
    assert!(files_under(&output).is_empty());
}

#[tokio::test]
async fn test_cancel_handle_works_from_another_thread() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("output");
    let runner = PatchRunner::new();

    let job = runner
        .start(
            create_test_payload(temp.path(), "handle"),
            output,
            PatchOptions::default(),
        )
        .unwrap();

    let handle = job.cancel_handle();
    std::thread::spawn(move || handle.cancel()).join().unwrap();

    let outcome = job.wait().await;
    assert!(matches!(outcome, PatchOutcome::Cancelled));
}

#[tokio::test]
async fn test_failed_outcome_for_corrupt_payload() {
    let temp = TempDir::new().unwrap();
    let archive_path = temp.path().join("corrupt.7z");
    fs::write(&archive_path, b"junk junk junk").unwrap();
    let payload = Payload::from_file(&archive_path).unwrap();

    let runner = PatchRunner::new();
    let mut job = runner
        .start(payload, temp.path().join("output"), PatchOptions::default())
        .unwrap();

    let mut terminal = None;
    while let Some(event) = job.recv().await {
        if let PatchEvent::Finished { outcome } = event {
            terminal = Some(outcome);
        }
    }

    match terminal {
        Some(PatchOutcome::Failed { message }) => assert!(!message.is_empty()),
        other => panic!("Expected a failed outcome, got: {:?}", other),
    }

    // A failed run releases the guard like any other outcome
    assert!(!runner.is_active());
    let job = runner
        .start(
            create_test_payload(temp.path(), "retry"),
            temp.path().join("output"),
            PatchOptions::default(),
        )
        .unwrap();
    let outcome = job.wait().await;
    assert!(matches!(outcome, PatchOutcome::Succeeded { .. }));
}
