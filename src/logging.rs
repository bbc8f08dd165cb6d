//! Structured logging setup - `tracing` to stderr, optionally mirrored to a
//! log file so a run can be replayed from its log.

use std::fs::File;
use std::io::Write as _;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Held by the engine for the run's lifetime; dropping it flushes the file
/// writer. `Engine::close_log` drops this explicitly so callers can finalize
/// the log before the process exits.
pub struct LogGuard {
    file: Option<Arc<Mutex<File>>>,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            let _ = file.lock().expect("log file poisoned").flush();
        }
    }
}

#[derive(Clone)]
struct SharedFile(Arc<Mutex<File>>);

impl<'a> MakeWriter<'a> for SharedFile {
    type Writer = Self;
    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log file poisoned").write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().expect("log file poisoned").flush()
    }
}

use std::io::Write;

fn level_filter(verbose: bool) -> EnvFilter {
    let default_level = if verbose { "dirsync=debug,info" } else { "dirsync=info,warn" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initializes the global `tracing` subscriber. `RUST_LOG` takes priority;
/// otherwise `verbose` picks between `info`+`debug` and `info`+`warn` as the
/// default level. When `log_path` is set, a second non-ANSI layer mirrors
/// output there.
pub fn init(verbose: bool, log_path: Option<&Path>) -> std::io::Result<LogGuard> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(level_filter(verbose));

    match log_path {
        Some(path) => {
            let file = Arc::new(Mutex::new(File::create(path)?));
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(SharedFile(Arc::clone(&file)))
                .with_filter(level_filter(verbose));

            let registry = tracing_subscriber::registry().with(stderr_layer).with(file_layer);
            let _ = tracing::subscriber::set_global_default(registry);

            Ok(LogGuard { file: Some(file) })
        }
        None => {
            let registry = tracing_subscriber::registry().with(stderr_layer);
            let _ = tracing::subscriber::set_global_default(registry);
            Ok(LogGuard { file: None })
        }
    }
}
