//! C4 - status store: the single piece of shared mutable state.
//!
//! All writes go through the typed helpers below, which take the mutex,
//! mutate, and release. `snapshot()` always returns a deep copy so readers
//! never see a torn or locked view (see design notes on deep-copy snapshots).

use crate::types::{FileStatus, Phase, SharedPlan, Status, StatusSnapshot, WorkerTelemetry};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

pub struct StatusStore {
    inner: Mutex<Status>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Status::default()),
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.lock().expect("status mutex poisoned").clone()
    }

    /// Sets the phase and returns `(previous, new)` so the caller can publish
    /// a `PhaseChanged` event without re-locking.
    pub fn set_phase(&self, to: Phase) -> (Phase, Phase) {
        let mut status = self.inner.lock().expect("status mutex poisoned");
        let from = status.phase;
        status.phase = to;
        (from, to)
    }

    pub fn begin_analysis(&self) {
        self.inner.lock().expect("status mutex poisoned").analysis_started = Some(Instant::now());
    }

    pub fn begin_sync(&self) {
        self.inner.lock().expect("status mutex poisoned").sync_started = Some(Instant::now());
    }

    pub fn finish(&self) {
        self.inner.lock().expect("status mutex poisoned").ended = Some(Instant::now());
    }

    pub fn record_scanned(&self, files: u64, bytes: u64) {
        let mut status = self.inner.lock().expect("status mutex poisoned");
        status.scanned_files += files;
        status.scanned_bytes += bytes;
    }

    pub fn set_plan(&self, plan: SharedPlan, total_files: u64, total_bytes: u64, already_synced: u64) {
        let mut status = self.inner.lock().expect("status mutex poisoned");
        status.total_files = total_files;
        status.total_bytes = total_bytes;
        status.already_synced_files = already_synced;
        status.plan = Some(plan);
    }

    pub fn mark_file_started(&self, relpath: &str) {
        let mut status = self.inner.lock().expect("status mutex poisoned");
        status.files_copying.push(relpath.to_string());
    }

    pub fn mark_file_complete(&self, relpath: &str, result: FileStatus, bytes: u64) {
        let mut status = self.inner.lock().expect("status mutex poisoned");
        status.files_copying.retain(|p| p != relpath);
        match result {
            FileStatus::Complete => {
                status.processed_files += 1;
                status.processed_bytes += bytes;
            }
            FileStatus::Error => status.failed_files += 1,
            FileStatus::Cancelled => status.cancelled_files += 1,
            _ => {}
        }
    }

    pub fn record_error(&self, path: PathBuf, cause: String) {
        self.inner.lock().expect("status mutex poisoned").errors.push((path, cause));
    }

    pub fn mark_deletion_started(&self, relpath: &str) {
        let mut status = self.inner.lock().expect("status mutex poisoned");
        status.files_deleting.push(relpath.to_string());
    }

    pub fn mark_deletion_complete(&self, relpath: &str, ok: bool, bytes: u64) {
        let mut status = self.inner.lock().expect("status mutex poisoned");
        status.files_deleting.retain(|p| p != relpath);
        if ok {
            status.deleted_files += 1;
            status.deleted_bytes += bytes;
        } else {
            status.deletion_errors += 1;
        }
    }

    pub fn update_worker_telemetry(&self, telemetry: WorkerTelemetry) {
        self.inner.lock().expect("status mutex poisoned").worker_telemetry = telemetry;
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_writes() {
        let store = StatusStore::new();
        store.record_scanned(3, 100);
        let snap = store.snapshot();
        assert_eq!(snap.scanned_files, 3);
        assert_eq!(snap.scanned_bytes, 100);
    }

    #[test]
    fn phase_transition_returns_previous() {
        let store = StatusStore::new();
        let (from, to) = store.set_phase(Phase::CountingSource);
        assert_eq!(from, Phase::Idle);
        assert_eq!(to, Phase::CountingSource);
    }

    #[test]
    fn file_complete_updates_counters_and_clears_in_flight() {
        let store = StatusStore::new();
        store.mark_file_started("a.txt");
        assert_eq!(store.snapshot().files_copying.len(), 1);
        store.mark_file_complete("a.txt", FileStatus::Complete, 42);
        let snap = store.snapshot();
        assert!(snap.files_copying.is_empty());
        assert_eq!(snap.processed_files, 1);
        assert_eq!(snap.processed_bytes, 42);
    }

    #[test]
    fn errors_only_ever_grow() {
        let store = StatusStore::new();
        store.record_error(PathBuf::from("a"), "oops".into());
        store.record_error(PathBuf::from("b"), "oops2".into());
        assert_eq!(store.snapshot().errors.len(), 2);
    }
}
