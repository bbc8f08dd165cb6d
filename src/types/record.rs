//! FileRecord - one entry observed by the scanner.

use std::path::PathBuf;
use std::time::SystemTime;

/// A single filesystem entry as seen by one side of a scan.
///
/// Immutable once produced. `relpath` uses `/` separators regardless of host
/// OS so source and dest records compare equal by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub relpath: String,
    pub size: u64,
    pub mtime: SystemTime,
    pub mode: u32,
    pub is_symlink: bool,
    /// Present only when `is_symlink` is true - the link's raw target.
    pub symlink_target: Option<PathBuf>,
}

impl FileRecord {
    pub fn new(relpath: String, size: u64, mtime: SystemTime, mode: u32) -> Self {
        Self {
            relpath,
            size,
            mtime,
            mode,
            is_symlink: false,
            symlink_target: None,
        }
    }

    pub fn symlink(relpath: String, mtime: SystemTime, target: PathBuf) -> Self {
        Self {
            relpath,
            size: 0,
            mtime,
            mode: 0o777,
            is_symlink: true,
            symlink_target: Some(target),
        }
    }
}
