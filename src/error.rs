//! Error taxonomy for the sync engine.
//!
//! Per-entry and per-file failures never surface here - they accumulate in
//! [`crate::types::Status::errors`] and are reported through events. `SyncError`
//! is reserved for failures that abort a call outright: bad configuration,
//! an unreadable root, or cancellation.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("source path does not exist: {0}")]
    SourceNotFound(PathBuf),

    #[error("source path is not a directory: {0}")]
    SourceNotDirectory(PathBuf),

    #[error("destination path is not a directory: {0}")]
    DestNotDirectory(PathBuf),

    #[error("source and destination must be different paths: {0}")]
    SameSourceAndDest(PathBuf),

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("cannot read directory {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("analyze() must complete successfully before sync()")]
    NotAnalyzed,

    #[error("sync cancelled")]
    Cancelled,

    #[error("ran out of disk space writing to {path}")]
    OutOfSpace { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
