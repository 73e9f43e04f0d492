//! Command-line interface for patching the VR runtime.
//!
//! The controlling thread of the tool: it moves the previous runtime
//! directory out of the way, starts the background extraction, renders
//! progress, wires Ctrl-C to the cancellation flag, and maps the terminal
//! outcome to the exit status.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use patcher::{
    displace_existing_runtime, probe, Displacement, PatchEvent, PatchOptions, PatchOutcome,
    PatchRunner, Payload,
};
use std::path::PathBuf;
use std::process;
use tracing::info;

/// Runtime payload compiled into the binary. The checked-in archive is a
/// valid but empty 7z container; release packaging swaps in the real
/// runtime payload.
static RUNTIME_PAYLOAD: &[u8] = include_bytes!("../payload/oculus-runtime.7z");
const RUNTIME_PAYLOAD_NAME: &str = "oculus-runtime.7z";

#[derive(Parser)]
#[command(name = "vrpatch")]
#[command(version, about = "Patch the VR runtime installation in place", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the installed runtime with the bundled payload
    Apply {
        /// Install directory the payload is unpacked into (the directory
        /// containing the runtime folder, usually ...\Oculus\Support)
        install_dir: PathBuf,

        /// Extract this archive instead of the bundled payload
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Name of the runtime directory to replace
        #[arg(long, default_value = "oculus-runtime")]
        runtime_dir: String,

        /// Name the previous runtime directory is moved to
        #[arg(long, default_value = "oculus-runtime_old")]
        backup_dir: String,

        /// Progress percentage at which the milestone message is shown
        #[arg(long, default_value = "75")]
        milestone_percent: u8,
    },

    /// List the payload's contents without extracting
    Inspect {
        /// Inspect this archive instead of the bundled payload
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply {
            install_dir,
            archive,
            runtime_dir,
            backup_dir,
            milestone_percent,
        } => handle_apply(install_dir, archive, runtime_dir, backup_dir, milestone_percent).await,
        Commands::Inspect { archive, json } => handle_inspect(archive, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// The bundled payload, unless the caller pointed at an archive on disk.
fn load_payload(archive: Option<PathBuf>) -> Result<Payload, patcher::PatchError> {
    match archive {
        Some(path) => Payload::from_file(&path),
        None => Ok(Payload::embedded(RUNTIME_PAYLOAD_NAME, RUNTIME_PAYLOAD)),
    }
}

async fn handle_apply(
    install_dir: PathBuf,
    archive: Option<PathBuf>,
    runtime_dir: String,
    backup_dir: String,
    milestone_percent: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = PatchOptions {
        runtime_dir_name: runtime_dir,
        backup_dir_name: backup_dir,
        milestone_percent,
        ..PatchOptions::default()
    };

    let payload = load_payload(archive)?;
    info!(payload = payload.name(), "applying runtime patch");

    // Move the previous runtime out of the way before any write
    match displace_existing_runtime(&install_dir, &options)? {
        Displacement::BackedUp => println!(
            "Moved {} to {}",
            options.runtime_dir_name, options.backup_dir_name
        ),
        Displacement::Removed => println!(
            "Backup already present, removed old {}",
            options.runtime_dir_name
        ),
        Displacement::NotPresent => println!(
            "No existing {} found, installing fresh",
            options.runtime_dir_name
        ),
    }

    // The payload's entry paths carry the runtime directory prefix, so the
    // install directory is the extraction root
    let runner = PatchRunner::new();
    let mut job = runner.start(payload, install_dir, options)?;

    // Ctrl-C requests cancellation; the worker stops at the next entry
    let cancel = job.cancel_handle();
    ctrlc::set_handler(move || cancel.cancel())?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{prefix} [{bar:40}] {pos:>3}%")?.progress_chars("=> "),
    );
    bar.set_prefix("Patching");

    let outcome = loop {
        match job.recv().await {
            Some(PatchEvent::Progress(update)) => bar.set_position(update.percent as u64),
            Some(PatchEvent::Milestone { message }) => bar.println(message),
            Some(PatchEvent::Finished { outcome }) => break outcome,
            None => {
                break PatchOutcome::Failed {
                    message: "event channel closed before completion".to_string(),
                }
            }
        }
    };

    match outcome {
        PatchOutcome::Succeeded { stats } => {
            bar.finish_with_message("done");
            println!(
                "Patch applied: {} files, {} bytes in {:.1}s",
                stats.files_written,
                stats.bytes_written,
                stats.duration.as_secs_f64()
            );
            Ok(())
        }
        PatchOutcome::Cancelled => {
            bar.abandon_with_message("cancelled");
            println!("Operation was cancelled.");
            process::exit(130);
        }
        PatchOutcome::Failed { message } => {
            bar.abandon_with_message("failed");
            Err(message.into())
        }
    }
}

fn handle_inspect(
    archive: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = load_payload(archive)?;
    let info = probe(&payload)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!(
        "{}: {} entries ({} files, {} directories), {} bytes uncompressed",
        payload.name(),
        info.entry_count,
        info.file_count,
        info.directory_count,
        info.total_bytes
    );
    for entry in &info.entries {
        let kind = if entry.is_directory { "dir " } else { "file" };
        println!("  {kind}  {:>12}  {}", entry.size, entry.path);
    }

    Ok(())
}
