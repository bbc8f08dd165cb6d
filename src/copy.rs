//! C7 - copy pipeline: moves one file from source to destination.
//!
//! Destination files are created/truncated in place - no `.part` temp file,
//! no rename. On error or cancellation mid-copy the destination file itself
//! is removed as best-effort cleanup, since it is the only file touched.

use crate::events::EventBus;
use crate::status_store::StatusStore;
use crate::types::{Event, FileStatus, FileToSync};
use crate::util::CancelToken;
use filetime::FileTime;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Time spent in the read and write syscalls of one copy, fed to the
/// worker pool's adaptive bottleneck controller (C8).
#[derive(Debug, Clone, Copy, Default)]
pub struct IoTiming {
    pub read_time: Duration,
    pub write_time: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct CopyOutcome {
    pub status: FileStatus,
    pub timing: IoTiming,
    /// Set when the failure was an out-of-disk-space write error.
    pub enospc: bool,
}

/// POSIX errno for "no space left on device", shared by Linux and macOS.
#[cfg(unix)]
const ENOSPC: i32 = 28;

fn is_out_of_space(err: &std::io::Error) -> bool {
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(ENOSPC)
    }
    #[cfg(not(unix))]
    {
        let _ = err;
        false
    }
}

/// Copies (or relinks) a single `FileToSync`, updating its atomic progress
/// counter and status, and recording the outcome in the status store.
pub fn copy_one(
    task: &Arc<FileToSync>,
    chunk_size: usize,
    cancel: &CancelToken,
    status: &StatusStore,
    events: &EventBus,
) -> CopyOutcome {
    task.set_status(FileStatus::Opening);
    status.mark_file_started(&task.relpath);
    events.publish(Event::FileStarted {
        relpath: task.relpath.clone(),
    });

    let outcome = if task.is_symlink {
        copy_symlink(task).map(|()| IoTiming::default())
    } else {
        copy_regular(task, chunk_size, cancel, events)
    };

    let (result, timing, enospc) = match outcome {
        Ok(timing) if cancel.is_cancelled() => {
            cleanup_partial(task);
            (FileStatus::Cancelled, timing, false)
        }
        Ok(timing) => (FileStatus::Complete, timing, false),
        Err(err) => {
            cleanup_partial(task);
            let enospc = is_out_of_space(&err);
            status.record_error(task.dest_path.clone(), err.to_string());
            events.publish(Event::Error {
                path: task.dest_path.clone(),
                cause: err.to_string(),
            });
            (FileStatus::Error, IoTiming::default(), enospc)
        }
    };

    task.set_status(result);
    status.mark_file_complete(&task.relpath, result, task.transferred());
    events.publish(Event::FileComplete {
        relpath: task.relpath.clone(),
        status: result,
    });

    CopyOutcome { status: result, timing, enospc }
}

fn copy_symlink(task: &FileToSync) -> std::io::Result<()> {
    let target = task
        .symlink_target
        .as_ref()
        .expect("symlink task must carry a target");

    if let Some(parent) = task.dest_path.parent() {
        fs::create_dir_all(parent)?;
    }
    if task.dest_path.symlink_metadata().is_ok() {
        fs::remove_file(&task.dest_path)?;
    }

    #[cfg(unix)]
    std::os::unix::fs::symlink(target, &task.dest_path)?;
    #[cfg(not(unix))]
    {
        let _ = target;
        return Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "symlinks are not supported on this platform",
        ));
    }

    Ok(())
}

fn copy_regular(
    task: &Arc<FileToSync>,
    chunk_size: usize,
    cancel: &CancelToken,
    events: &EventBus,
) -> std::io::Result<IoTiming> {
    if let Some(parent) = task.dest_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut source = File::open(&task.source_path)?;
    let mut dest = open_dest(&task.dest_path)?;

    task.set_status(FileStatus::Copying);
    let mut buf = vec![0u8; chunk_size];
    let mut timing = IoTiming::default();

    loop {
        if cancel.is_cancelled() {
            return Ok(timing);
        }
        let read_start = Instant::now();
        let n = source.read(&mut buf)?;
        timing.read_time += read_start.elapsed();
        if n == 0 {
            break;
        }
        let write_start = Instant::now();
        dest.write_all(&buf[..n])?;
        timing.write_time += write_start.elapsed();

        let total = task.add_transferred(n as u64);
        events.publish(Event::FileProgress {
            relpath: task.relpath.clone(),
            transferred: total,
        });
    }

    let sync_start = Instant::now();
    dest.sync_all()?;
    timing.write_time += sync_start.elapsed();
    task.set_status(FileStatus::Finalizing);
    drop(dest);
    drop(source);

    let mtime = FileTime::from_system_time(task.mtime);
    filetime::set_file_mtime(&task.dest_path, mtime)?;

    Ok(timing)
}

#[cfg(unix)]
fn open_dest(path: &std::path::Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
}

#[cfg(not(unix))]
fn open_dest(path: &std::path::Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create(true).truncate(true).open(path)
}

fn cleanup_partial(task: &FileToSync) {
    let _ = fs::remove_file(&task.dest_path);
}
