//! C9 - engine facade: orchestrates C1-C8 behind a small imperative API.

use crate::comparator;
use crate::deleter;
use crate::error::{Result, SyncError};
use crate::events::{EventBus, EventStream};
use crate::logging::LogGuard;
use crate::pool::{self, PoolConfig};
use crate::scanner;
use crate::status_store::StatusStore;
use crate::types::{
    Event, FileToSync, Phase, ScanTarget, SharedPlan, StatusSnapshot,
};
use crate::util::CancelToken;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

struct EngineConfig {
    pattern: String,
    workers: Option<usize>,
    adaptive: bool,
    delete_enabled: bool,
    skip_unchanged_dest_scan: bool,
    previous_dest_count: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            workers: None,
            adaptive: false,
            delete_enabled: false,
            skip_unchanged_dest_scan: false,
            previous_dest_count: None,
        }
    }
}

/// The public entry point. Cheap to construct; expensive work happens in
/// `analyze`/`sync`, both of which block the calling thread - run them on a
/// background thread if a UI needs to stay responsive, and drive them via
/// `status()`/`subscribe()` from the caller's own thread.
pub struct Engine {
    source: PathBuf,
    dest: PathBuf,
    config: Mutex<EngineConfig>,
    cancel: CancelToken,
    status: StatusStore,
    events: EventBus,
    plan: Mutex<Option<SharedPlan>>,
    log_guard: Mutex<Option<LogGuard>>,
}

impl Engine {
    pub fn new(source: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<Self> {
        let source = source.as_ref().to_path_buf();
        let dest = dest.as_ref().to_path_buf();

        if !source.exists() {
            return Err(SyncError::SourceNotFound(source));
        }
        if !source.is_dir() {
            return Err(SyncError::SourceNotDirectory(source));
        }
        if source == dest {
            return Err(SyncError::SameSourceAndDest(source));
        }
        if dest.exists() && !dest.is_dir() {
            return Err(SyncError::DestNotDirectory(dest));
        }

        Ok(Self {
            source,
            dest,
            config: Mutex::new(EngineConfig::default()),
            cancel: CancelToken::new(),
            status: StatusStore::new(),
            events: EventBus::default(),
            plan: Mutex::new(None),
            log_guard: Mutex::new(None),
        })
    }

    pub fn set_pattern(&self, pattern: impl Into<String>) -> Result<()> {
        let pattern = pattern.into();
        if !pattern.is_empty() {
            glob::Pattern::new(&pattern).map_err(|source| SyncError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        self.config.lock().expect("engine config poisoned").pattern = pattern;
        Ok(())
    }

    pub fn set_workers(&self, n: usize) {
        self.config.lock().expect("engine config poisoned").workers = Some(n);
    }

    pub fn set_adaptive(&self, enabled: bool) {
        self.config.lock().expect("engine config poisoned").adaptive = enabled;
    }

    pub fn set_delete_enabled(&self, enabled: bool) {
        self.config.lock().expect("engine config poisoned").delete_enabled = enabled;
    }

    /// See design notes 9.1(4): off by default, since silently skipping a
    /// rescan is surprising for a one-shot tool.
    pub fn set_skip_unchanged_dest_scan(&self, enabled: bool, previous_count: Option<u64>) {
        let mut config = self.config.lock().expect("engine config poisoned");
        config.skip_unchanged_dest_scan = enabled;
        config.previous_dest_count = previous_count;
    }

    pub fn attach_log(&self, guard: LogGuard) {
        *self.log_guard.lock().expect("log guard poisoned") = Some(guard);
    }

    pub fn close_log(&self) {
        self.log_guard.lock().expect("log guard poisoned").take();
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    pub fn subscribe(&self) -> (u64, EventStream) {
        self.events.subscribe()
    }

    pub fn unsubscribe(&self, id: u64) {
        self.events.unsubscribe(id);
    }

    fn transition(&self, to: Phase) {
        let (from, to) = self.status.set_phase(to);
        info!(?from, ?to, "phase changed");
        self.events.publish(Event::PhaseChanged { from, to });
    }

    /// Runs the scan/compare pipeline (phases `counting_source` through
    /// `analysis_complete`). Source and destination are scanned in parallel.
    pub fn analyze(&self) -> Result<()> {
        self.status.begin_analysis();
        let pattern = self.config.lock().expect("engine config poisoned").pattern.clone();
        let (skip_dest_scan, previous_count) = {
            let config = self.config.lock().expect("engine config poisoned");
            (config.skip_unchanged_dest_scan, config.previous_dest_count)
        };

        self.transition(Phase::CountingSource);
        let (_, source_bytes) = scanner::count_only(&self.source, &pattern, &self.cancel)?;

        self.transition(Phase::CountingDest);
        // See design notes 9.1(4): this only tells us whether the destination
        // looks unchanged since the caller's last run. Without a cached record
        // set from that run there is nothing to skip the scan in favor of, so
        // the flag is informational until a persisted-cache variant exists.
        let dest_looks_unchanged = skip_dest_scan
            && previous_count
                .map(|prev| scanner::count_only(&self.dest, &pattern, &self.cancel).map(|(n, _)| n == prev))
                .transpose()?
                .unwrap_or(false);
        if dest_looks_unchanged {
            tracing::debug!("destination file count unchanged since last run");
        }

        let (source_result, dest_result) = std::thread::scope(|scope| {
            self.transition(Phase::ScanningSource);
            let source_handle = scope.spawn(|| {
                scanner::scan(&self.source, &pattern, &self.cancel, &self.events, ScanTarget::Source)
            });

            self.transition(Phase::ScanningDest);
            let dest_handle = scope.spawn(|| {
                scanner::scan(&self.dest, &pattern, &self.cancel, &self.events, ScanTarget::Dest)
            });

            (source_handle.join().expect("source scan thread panicked"), dest_handle.join().expect("dest scan thread panicked"))
        });

        let source_scan = source_result?;
        let dest_scan = dest_result?;

        for (path, cause) in source_scan.errors.into_iter().chain(dest_scan.errors) {
            self.status.record_error(path.clone(), cause.clone());
            self.events.publish(Event::Error { path, cause });
        }

        self.status.record_scanned(
            (source_scan.records.len() + dest_scan.records.len()) as u64,
            source_bytes.max(source_scan.total_bytes) + dest_scan.total_bytes,
        );

        if source_scan.cancelled || dest_scan.cancelled {
            self.transition(Phase::Cancelled);
            return Err(SyncError::Cancelled);
        }

        self.transition(Phase::Comparing);
        self.events.publish(Event::CompareStarted);
        let plan = Arc::new(comparator::compare(source_scan.records, dest_scan.records));
        self.events.publish(Event::CompareComplete { plan: Arc::clone(&plan) });

        let total_files = (plan.only_in_source.len() + plan.modified.len()) as u64;
        let total_bytes = plan.only_in_source_stats().bytes + plan.modified_stats().bytes;
        let already_synced = plan.in_both.len() as u64;

        self.status.set_plan(Arc::clone(&plan), total_files, total_bytes, already_synced);
        *self.plan.lock().expect("plan mutex poisoned") = Some(plan);

        self.transition(Phase::AnalysisComplete);
        Ok(())
    }

    /// Runs deletion (if enabled) followed by the copy phase. Requires a
    /// prior successful `analyze`.
    pub fn sync(&self) -> Result<()> {
        let plan = self
            .plan
            .lock()
            .expect("plan mutex poisoned")
            .clone()
            .ok_or(SyncError::NotAnalyzed)?;

        self.status.begin_sync();

        let (delete_enabled, workers, adaptive) = {
            let config = self.config.lock().expect("engine config poisoned");
            (config.delete_enabled, config.workers, config.adaptive)
        };

        if delete_enabled && !plan.only_in_dest.is_empty() {
            self.transition(Phase::Deleting);
            deleter::delete(&self.dest, &plan.only_in_dest, &self.cancel, &self.status, &self.events);
        }

        if self.cancel.is_cancelled() {
            self.transition(Phase::Cancelled);
            self.status.finish();
            return Err(SyncError::Cancelled);
        }

        self.transition(Phase::Copying);
        let tasks = build_tasks(&self.source, &self.dest, &plan);

        let mut pool_config = PoolConfig {
            adaptive,
            ..PoolConfig::default()
        };
        if let Some(n) = workers {
            pool_config.workers = n.clamp(1, pool_config.max_workers);
        }

        let stats = pool::run(tasks, &pool_config, &self.cancel, &self.status, &self.events);
        if stats.failed > 0 {
            warn!(failed = stats.failed, "sync completed with per-file errors");
        }

        if let Some(path) = stats.out_of_space {
            self.transition(Phase::Error);
            self.status.finish();
            return Err(SyncError::OutOfSpace { path });
        }

        self.transition(Phase::Finalizing);
        self.status.finish();

        if self.cancel.is_cancelled() {
            self.transition(Phase::Cancelled);
            return Err(SyncError::Cancelled);
        }

        self.transition(Phase::Complete);
        Ok(())
    }
}

fn build_tasks(source_root: &Path, dest_root: &Path, plan: &SharedPlan) -> Vec<Arc<FileToSync>> {
    plan.to_copy()
        .map(|entry| {
            let source_path = source_root.join(&entry.relpath);
            let dest_path = dest_root.join(&entry.relpath);
            if entry.record.is_symlink {
                FileToSync::new_symlink(
                    source_path,
                    dest_path,
                    entry.relpath.clone(),
                    entry.record.mtime,
                    entry.record.symlink_target.clone().unwrap_or_default(),
                )
            } else {
                FileToSync::new(
                    source_path,
                    dest_path,
                    entry.relpath.clone(),
                    entry.record.size,
                    entry.record.mtime,
                )
            }
        })
        .collect()
}
