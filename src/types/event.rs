//! Event - coarse-grained lifecycle notifications published on the bus.

use super::plan::SharedPlan;
use super::status::Phase;
use super::task::FileStatus;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum ScanTarget {
    Source,
    Dest,
}

#[derive(Debug, Clone)]
pub enum Event {
    ScanStarted { target: ScanTarget },
    ScanComplete { target: ScanTarget, count: u64 },
    CompareStarted,
    CompareComplete { plan: SharedPlan },
    FileStarted { relpath: String },
    FileProgress { relpath: String, transferred: u64 },
    FileComplete { relpath: String, status: FileStatus },
    DeletionStarted,
    DeletionComplete { count: u64 },
    PhaseChanged { from: Phase, to: Phase },
    Error { path: PathBuf, cause: String },
}
