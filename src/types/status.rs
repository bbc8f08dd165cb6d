//! Status - the whole observable state of a run.

use super::plan::SharedPlan;
use std::path::PathBuf;
use std::time::Instant;

/// The engine's phase FSM (see design notes: analysis phases run in parallel
/// for source/dest but are reported as whichever started first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    CountingSource,
    ScanningSource,
    CountingDest,
    ScanningDest,
    Comparing,
    AnalysisComplete,
    Deleting,
    Copying,
    Finalizing,
    Complete,
    Cancelled,
    Error,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Cancelled | Phase::Error)
    }
}

/// Which side of the copy the adaptive controller believes is saturated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bottleneck {
    #[default]
    Balanced,
    SourceLimited,
    DestLimited,
}

#[derive(Debug, Clone, Default)]
pub struct WorkerTelemetry {
    pub active_workers: usize,
    pub max_workers: usize,
    pub per_worker_rate_bps: Vec<f64>,
    pub total_rate_bps: f64,
    pub read_percent: f64,
    pub write_percent: f64,
    pub bottleneck: Bottleneck,
}

/// Whole observable state. One instance lives for the engine's lifetime;
/// readers always get a deep copy via `StatusStore::snapshot` (see C4).
#[derive(Debug, Clone)]
pub struct Status {
    pub phase: Phase,

    pub scanned_files: u64,
    pub scanned_bytes: u64,
    pub total_files: u64,
    pub total_bytes: u64,
    pub processed_files: u64,
    pub processed_bytes: u64,
    pub failed_files: u64,
    pub cancelled_files: u64,
    pub deleted_files: u64,
    pub deleted_bytes: u64,
    pub deletion_errors: u64,
    pub already_synced_files: u64,

    pub analysis_started: Option<Instant>,
    pub sync_started: Option<Instant>,
    pub ended: Option<Instant>,

    pub worker_telemetry: WorkerTelemetry,

    pub files_copying: Vec<String>,
    pub files_deleting: Vec<String>,

    pub errors: Vec<(PathBuf, String)>,

    pub plan: Option<SharedPlan>,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            scanned_files: 0,
            scanned_bytes: 0,
            total_files: 0,
            total_bytes: 0,
            processed_files: 0,
            processed_bytes: 0,
            failed_files: 0,
            cancelled_files: 0,
            deleted_files: 0,
            deleted_bytes: 0,
            deletion_errors: 0,
            already_synced_files: 0,
            analysis_started: None,
            sync_started: None,
            ended: None,
            worker_telemetry: WorkerTelemetry::default(),
            files_copying: Vec::new(),
            files_deleting: Vec::new(),
            errors: Vec::new(),
            plan: None,
        }
    }
}

/// A deep-copied, point-in-time view returned by `status()`. Identical in
/// shape to `Status` - the distinction is purely "owned by the caller".
pub type StatusSnapshot = Status;
