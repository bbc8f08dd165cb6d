//! CLI glue: wires a validated `Config` to the engine and the terminal UI,
//! and maps outcomes to the exit codes in the external interface contract.

use crate::config::Config;
use crate::engine::Engine;
use crate::error::SyncError;
use crate::logging;
use crate::ui::ProgressReporter;
use anyhow::Context;
use std::io::{self, Write};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
pub const EXIT_CANCELLED: i32 = 2;
pub const EXIT_PARTIAL: i32 = 3;

pub fn run(config: Config) -> anyhow::Result<i32> {
    let log_guard = logging::init(config.verbose, config.log_path.as_deref())
        .context("failed to initialize logging")?;

    let engine = Engine::new(&config.source, &config.destination)?;
    engine.attach_log(log_guard);
    engine.set_pattern(&config.pattern)?;
    if let Some(workers) = config.workers {
        engine.set_workers(workers);
    }
    engine.set_adaptive(config.adaptive);
    engine.set_delete_enabled(config.delete_enabled);

    if let Err(err) = engine.analyze() {
        return Ok(handle_failure(&engine, err));
    }

    let plan_snapshot = engine.status();
    let to_copy = plan_snapshot
        .plan
        .as_ref()
        .map(|p| p.only_in_source.len() + p.modified.len())
        .unwrap_or(0);
    let to_delete = plan_snapshot.plan.as_ref().map(|p| p.only_in_dest.len()).unwrap_or(0);

    if to_copy == 0 && to_delete == 0 {
        println!("Nothing to do - destination already matches source.");
        engine.close_log();
        return Ok(EXIT_SUCCESS);
    }

    println!("{to_copy} file(s) to copy, {to_delete} file(s) to delete.");
    if !config.skip_confirmation && !confirm("Proceed with sync?")? {
        println!("Aborted.");
        engine.close_log();
        return Ok(EXIT_SUCCESS);
    }

    let reporter = ProgressReporter::new();
    let exit_code = std::thread::scope(|scope| {
        let sync_handle = scope.spawn(|| engine.sync());
        reporter.run(&engine);
        match sync_handle.join().expect("sync thread panicked") {
            Ok(()) => {
                let snap = engine.status();
                if snap.failed_files > 0 || snap.deletion_errors > 0 {
                    EXIT_PARTIAL
                } else {
                    EXIT_SUCCESS
                }
            }
            Err(err) => handle_failure(&engine, err),
        }
    });

    engine.close_log();
    Ok(exit_code)
}

fn handle_failure(engine: &Engine, err: SyncError) -> i32 {
    engine.close_log();
    match err {
        SyncError::Cancelled => {
            eprintln!("Sync cancelled.");
            EXIT_CANCELLED
        }
        other => {
            eprintln!("Error: {other}");
            if let Some(hint) = remediation_hint(&other) {
                eprintln!("  hint: {hint}");
            }
            EXIT_FATAL
        }
    }
}

fn remediation_hint(err: &SyncError) -> Option<&'static str> {
    match err {
        SyncError::OutOfSpace { .. } => Some("free up space on the destination filesystem and retry"),
        SyncError::SourceNotFound(_) | SyncError::SourceNotDirectory(_) => {
            Some("check that the source path exists and is a directory")
        }
        SyncError::DestNotDirectory(_) => Some("the destination exists but is not a directory"),
        SyncError::RootUnreadable { .. } => Some("check read permissions on the path"),
        SyncError::Io(io_err) if io_err.kind() == io::ErrorKind::PermissionDenied => {
            Some("check filesystem permissions")
        }
        _ => None,
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
