//! C2 - scanner: walks one tree and produces `FileRecord`s.

use crate::error::{Result, SyncError};
use crate::events::EventBus;
use crate::matcher;
use crate::types::{Event, FileRecord, ScanTarget};
use crate::util::CancelToken;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub struct ScanResult {
    pub records: Vec<FileRecord>,
    pub total_bytes: u64,
    pub cancelled: bool,
    pub errors: Vec<(PathBuf, String)>,
}

/// Cheap pass that returns `(file_count, total_bytes)` without allocating
/// `FileRecord`s. Used by the destination's optional unchanged-scan skip.
pub fn count_only(root: &Path, pattern: &str, cancel: &CancelToken) -> Result<(u64, u64)> {
    let mut count = 0u64;
    let mut bytes = 0u64;

    for entry in walker(root) {
        if cancel.is_cancelled() {
            break;
        }
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if is_root(&entry, root) {
            continue;
        }
        let ft = match entry.file_type() {
            Some(ft) => ft,
            None => continue,
        };
        if ft.is_dir() {
            continue;
        }
        let relpath = relative_path(entry.path(), root);
        if !matcher::matches(&relpath, pattern) {
            continue;
        }
        count += 1;
        if let Ok(meta) = entry.metadata() {
            bytes += meta.len();
        }
    }

    Ok((count, bytes))
}

/// Full walk, producing one `FileRecord` per matched entry. Per-entry I/O
/// errors are recorded and scanning continues; an unreadable root is fatal.
pub fn scan(
    root: &Path,
    pattern: &str,
    cancel: &CancelToken,
    events: &EventBus,
    target: ScanTarget,
) -> Result<ScanResult> {
    if !root.is_dir() {
        return Err(SyncError::RootUnreadable {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    events.publish(Event::ScanStarted {
        target: target.clone(),
    });

    let mut records = Vec::new();
    let mut total_bytes = 0u64;
    let mut errors = Vec::new();
    let mut cancelled = false;

    for entry in walker(root) {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                errors.push((root.to_path_buf(), err.to_string()));
                continue;
            }
        };

        if is_root(&entry, root) {
            continue;
        }

        let ft = match entry.file_type() {
            Some(ft) => ft,
            None => continue,
        };

        if ft.is_dir() {
            continue;
        }

        let relpath = relative_path(entry.path(), root);
        if !matcher::matches(&relpath, pattern) {
            continue;
        }

        if ft.is_symlink() {
            match std::fs::symlink_metadata(entry.path()).and_then(|m| m.modified()) {
                Ok(mtime) => match std::fs::read_link(entry.path()) {
                    Ok(target) => {
                        records.push(FileRecord::symlink(relpath, mtime, target));
                    }
                    Err(err) => errors.push((entry.path().to_path_buf(), err.to_string())),
                },
                Err(err) => errors.push((entry.path().to_path_buf(), err.to_string())),
            }
            continue;
        }

        if !ft.is_file() {
            // Sockets, devices, fifos - not mirrored.
            continue;
        }

        match entry.metadata() {
            Ok(meta) => {
                let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                let mode = mode_of(&meta);
                total_bytes += meta.len();
                records.push(FileRecord::new(relpath, meta.len(), mtime, mode));
            }
            Err(err) => errors.push((entry.path().to_path_buf(), err.to_string())),
        }
    }

    events.publish(Event::ScanComplete {
        target,
        count: records.len() as u64,
    });

    Ok(ScanResult {
        records,
        total_bytes,
        cancelled,
        errors,
    })
}

fn walker(root: &Path) -> impl Iterator<Item = std::result::Result<ignore::DirEntry, ignore::Error>> {
    WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .build()
}

fn is_root(entry: &ignore::DirEntry, root: &Path) -> bool {
    entry.path() == root
}

fn relative_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn mode_of(_meta: &std::fs::Metadata) -> u32 {
    0o644
}
