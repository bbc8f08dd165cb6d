//! FileToSync - one work item flowing through the copy pipeline.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// Lifecycle of a single file as it passes through the copy pipeline.
///
/// Strict sequence: `Pending -> Opening -> Copying -> (Finalizing -> Complete) | Error | Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FileStatus {
    Pending = 0,
    Opening = 1,
    Copying = 2,
    Finalizing = 3,
    Complete = 4,
    Error = 5,
    Cancelled = 6,
}

impl FileStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => FileStatus::Pending,
            1 => FileStatus::Opening,
            2 => FileStatus::Copying,
            3 => FileStatus::Finalizing,
            4 => FileStatus::Complete,
            5 => FileStatus::Error,
            _ => FileStatus::Cancelled,
        }
    }
}

/// One queued copy (or re-copy) operation.
///
/// `transferred` is an atomic so progress can be published from the copy
/// pipeline's hot loop without taking the status mutex (see C4/C7 in the design).
#[derive(Debug)]
pub struct FileToSync {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub relpath: String,
    pub size: u64,
    pub mtime: SystemTime,
    pub is_symlink: bool,
    pub symlink_target: Option<PathBuf>,
    transferred: AtomicU64,
    status: AtomicU8,
}

impl FileToSync {
    pub fn new(
        source_path: PathBuf,
        dest_path: PathBuf,
        relpath: String,
        size: u64,
        mtime: SystemTime,
    ) -> Arc<Self> {
        Arc::new(Self {
            source_path,
            dest_path,
            relpath,
            size,
            mtime,
            is_symlink: false,
            symlink_target: None,
            transferred: AtomicU64::new(0),
            status: AtomicU8::new(FileStatus::Pending as u8),
        })
    }

    pub fn new_symlink(
        source_path: PathBuf,
        dest_path: PathBuf,
        relpath: String,
        mtime: SystemTime,
        target: PathBuf,
    ) -> Arc<Self> {
        Arc::new(Self {
            source_path,
            dest_path,
            relpath,
            size: 0,
            mtime,
            is_symlink: true,
            symlink_target: Some(target),
            transferred: AtomicU64::new(0),
            status: AtomicU8::new(FileStatus::Pending as u8),
        })
    }

    pub fn status(&self) -> FileStatus {
        FileStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn set_status(&self, status: FileStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    pub fn transferred(&self) -> u64 {
        self.transferred.load(Ordering::Acquire)
    }

    pub fn add_transferred(&self, n: u64) -> u64 {
        self.transferred.fetch_add(n, Ordering::AcqRel) + n
    }
}
