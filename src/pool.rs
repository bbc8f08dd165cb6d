//! C8 - worker pool and adaptive bottleneck controller.
//!
//! Workers pull `FileToSync` items off a bounded dispatch queue and run the
//! copy pipeline. In adaptive mode a controller thread samples read/write
//! timing once a second and grows or shrinks the pool; resizing is
//! cooperative - a worker told to stand down finishes its current file first.
//! A separate sampler thread, always running regardless of adaptive mode,
//! publishes throughput telemetry on a 500ms cadence over a rolling 5-second
//! window.

use crate::copy::{self, IoTiming};
use crate::events::EventBus;
use crate::status_store::StatusStore;
use crate::types::{Bottleneck, FileStatus, FileToSync, WorkerTelemetry};
use crate::util::CancelToken;
use crossbeam_channel::Receiver;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::Scope;
use std::time::{Duration, Instant};

const SATURATION_THRESHOLD: f64 = 0.85;
const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);
const SAMPLE_WINDOW: Duration = Duration::from_secs(5);
/// Two files in a row failing with ENOSPC is treated as a full disk, not a
/// one-off quota hiccup.
const ENOSPC_FATAL_THRESHOLD: u32 = 2;

pub struct PoolConfig {
    pub workers: usize,
    pub max_workers: usize,
    pub adaptive: bool,
    pub chunk_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let cores = num_cpus::get().max(2);
        Self {
            workers: cores.clamp(2, 32),
            max_workers: 32,
            adaptive: false,
            chunk_size: copy::DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub processed: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Set when two or more consecutive files failed with ENOSPC - the run
    /// was aborted rather than left to fail file by file.
    pub out_of_space: Option<PathBuf>,
}

struct Counters {
    read_nanos: AtomicU64,
    write_nanos: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    bytes: AtomicU64,
    per_worker_bytes: Vec<AtomicU64>,
    remaining: AtomicUsize,
    consecutive_enospc: AtomicU64,
    fatal_path: Mutex<Option<PathBuf>>,
}

impl Counters {
    fn new(max_workers: usize, task_count: usize) -> Self {
        Self {
            read_nanos: AtomicU64::new(0),
            write_nanos: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            per_worker_bytes: (0..max_workers).map(|_| AtomicU64::new(0)).collect(),
            remaining: AtomicUsize::new(task_count),
            consecutive_enospc: AtomicU64::new(0),
            fatal_path: Mutex::new(None),
        }
    }
}

/// Runs every `FileToSync` in `tasks` to completion (or cancellation) and
/// returns aggregate counts. Blocks the calling thread until the queue drains.
pub fn run(
    tasks: Vec<Arc<FileToSync>>,
    config: &PoolConfig,
    cancel: &CancelToken,
    status: &StatusStore,
    events: &EventBus,
) -> PoolStats {
    let task_count = tasks.len();
    let queue_len = task_count.max(1);
    let (tx, rx) = crossbeam_channel::bounded(queue_len);
    for task in tasks {
        let _ = tx.send(task);
    }
    drop(tx);

    let counters = Counters::new(config.max_workers, task_count);
    let active_target = AtomicUsize::new(config.workers);

    std::thread::scope(|scope| {
        for id in 0..config.workers {
            spawn_worker(scope, &rx, cancel, config, status, events, &counters, &active_target, id);
        }

        if config.adaptive {
            scope.spawn(|| {
                run_controller(
                    &counters,
                    &active_target,
                    config.max_workers,
                    cancel,
                    scope,
                    &rx,
                    config,
                    status,
                    events,
                )
            });
        }

        scope.spawn(|| run_sampler(&counters, &active_target, config.max_workers, status, cancel));
    });

    let telemetry = telemetry_from(&counters, active_target.load(Ordering::SeqCst), config.max_workers);
    status.update_worker_telemetry(telemetry);

    PoolStats {
        processed: counters.processed.load(Ordering::Relaxed),
        failed: counters.failed.load(Ordering::Relaxed),
        cancelled: counters.cancelled.load(Ordering::Relaxed),
        out_of_space: counters.fatal_path.lock().expect("fatal path poisoned").clone(),
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_worker<'scope>(
    scope: &'scope Scope<'scope, '_>,
    rx: &'scope Receiver<Arc<FileToSync>>,
    cancel: &'scope CancelToken,
    config: &'scope PoolConfig,
    status: &'scope StatusStore,
    events: &'scope EventBus,
    counters: &'scope Counters,
    active_target: &'scope AtomicUsize,
    id: usize,
) {
    scope.spawn(move || worker_loop(id, rx, cancel, config.chunk_size, status, events, counters, active_target));
}

fn worker_loop(
    id: usize,
    rx: &Receiver<Arc<FileToSync>>,
    cancel: &CancelToken,
    chunk_size: usize,
    status: &StatusStore,
    events: &EventBus,
    counters: &Counters,
    active_target: &AtomicUsize,
) {
    loop {
        if cancel.is_cancelled() || id >= active_target.load(Ordering::SeqCst) {
            return;
        }

        let task = match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(task) => task,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
        };

        let outcome = copy::copy_one(&task, chunk_size, cancel, status, events);
        let transferred = task.transferred();
        record(counters, id, outcome.timing, outcome.status, transferred);
        note_enospc(counters, outcome.enospc, &task.dest_path, cancel);
    }
}

fn record(counters: &Counters, id: usize, timing: IoTiming, result: FileStatus, transferred: u64) {
    counters.read_nanos.fetch_add(timing.read_time.as_nanos() as u64, Ordering::Relaxed);
    counters.write_nanos.fetch_add(timing.write_time.as_nanos() as u64, Ordering::Relaxed);
    counters.bytes.fetch_add(transferred, Ordering::Relaxed);
    if let Some(slot) = counters.per_worker_bytes.get(id) {
        slot.fetch_add(transferred, Ordering::Relaxed);
    }
    counters.remaining.fetch_sub(1, Ordering::Relaxed);
    match result {
        FileStatus::Complete => counters.processed.fetch_add(1, Ordering::Relaxed),
        FileStatus::Error => counters.failed.fetch_add(1, Ordering::Relaxed),
        FileStatus::Cancelled => counters.cancelled.fetch_add(1, Ordering::Relaxed),
        _ => 0,
    };
}

/// Tracks consecutive ENOSPC failures across every worker (a coarse, racy
/// approximation of "consecutive" under concurrency, acceptable since the
/// only consequence of over/under-counting by one is aborting a file or two
/// earlier/later than strictly necessary). Two in a row cancels the run.
fn note_enospc(counters: &Counters, enospc: bool, path: &std::path::Path, cancel: &CancelToken) {
    if enospc {
        let n = counters.consecutive_enospc.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= ENOSPC_FATAL_THRESHOLD as u64 {
            *counters.fatal_path.lock().expect("fatal path poisoned") = Some(path.to_path_buf());
            cancel.cancel();
        }
    } else {
        counters.consecutive_enospc.store(0, Ordering::SeqCst);
    }
}

/// Samples the read/write time ratio once a second. Per design notes: a side
/// at >= 60% of total I/O time is the bottleneck; two consecutive samples
/// with no new completions shrink the pool; a balanced, still-growing pool
/// gains one worker per sample.
#[allow(clippy::too_many_arguments)]
fn run_controller<'scope>(
    counters: &Counters,
    active_target: &AtomicUsize,
    max_workers: usize,
    cancel: &CancelToken,
    scope: &'scope Scope<'scope, '_>,
    rx: &'scope Receiver<Arc<FileToSync>>,
    config: &'scope PoolConfig,
    status: &'scope StatusStore,
    events: &'scope EventBus,
) {
    let mut last_processed = 0u64;
    let mut consecutive_drops = 0u32;

    loop {
        std::thread::sleep(Duration::from_secs(1));
        if cancel.is_cancelled() || rx.is_empty() {
            return;
        }

        let bottleneck = bottleneck_of(counters);
        let processed = counters.processed.load(Ordering::Relaxed);
        let throughput_dropped = processed <= last_processed;
        last_processed = processed;

        if throughput_dropped {
            consecutive_drops += 1;
        } else {
            consecutive_drops = 0;
        }

        let current = active_target.load(Ordering::SeqCst);
        if consecutive_drops >= 2 && current > 1 {
            active_target.fetch_sub(1, Ordering::SeqCst);
            consecutive_drops = 0;
        } else if should_grow(bottleneck, is_saturated(counters), current, max_workers, throughput_dropped) {
            let new_id = active_target.fetch_add(1, Ordering::SeqCst);
            spawn_worker(scope, rx, cancel, config, status, events, counters, active_target, new_id);
        }
    }
}

/// Growth only happens when the pool is balanced, under its cap, still
/// making progress, and neither side is already saturated - adding a worker
/// to a saturated side just adds contention, not throughput.
fn should_grow(bottleneck: Bottleneck, saturated: bool, current: usize, max_workers: usize, throughput_dropped: bool) -> bool {
    bottleneck == Bottleneck::Balanced && !saturated && current < max_workers && !throughput_dropped
}

fn bottleneck_of(counters: &Counters) -> Bottleneck {
    let read_nanos = counters.read_nanos.load(Ordering::Relaxed);
    let write_nanos = counters.write_nanos.load(Ordering::Relaxed);
    let total = read_nanos + write_nanos;
    if total == 0 {
        Bottleneck::Balanced
    } else if read_nanos as f64 >= 0.6 * total as f64 {
        Bottleneck::SourceLimited
    } else if write_nanos as f64 >= 0.6 * total as f64 {
        Bottleneck::DestLimited
    } else {
        Bottleneck::Balanced
    }
}

/// True once either side has consumed >85% of total I/O time - at that
/// point adding workers just contends harder for the already-saturated side.
fn is_saturated(counters: &Counters) -> bool {
    let read_nanos = counters.read_nanos.load(Ordering::Relaxed);
    let write_nanos = counters.write_nanos.load(Ordering::Relaxed);
    let total = read_nanos + write_nanos;
    if total == 0 {
        return false;
    }
    read_nanos as f64 >= SATURATION_THRESHOLD * total as f64
        || write_nanos as f64 >= SATURATION_THRESHOLD * total as f64
}

/// Publishes throughput telemetry on a 500ms cadence, computing rates from a
/// rolling 5-second window of byte-count samples, until the queue drains or
/// the run is cancelled.
fn run_sampler(
    counters: &Counters,
    active_target: &AtomicUsize,
    max_workers: usize,
    status: &StatusStore,
    cancel: &CancelToken,
) {
    let mut history: VecDeque<(Instant, u64)> = VecDeque::new();
    let mut per_worker_history: Vec<VecDeque<(Instant, u64)>> =
        (0..max_workers).map(|_| VecDeque::new()).collect();

    loop {
        std::thread::sleep(SAMPLE_INTERVAL);
        let now = Instant::now();

        history.push_back((now, counters.bytes.load(Ordering::Relaxed)));
        prune_window(&mut history, now);
        let total_rate_bps = rate_from_window(&history);

        let active = active_target.load(Ordering::SeqCst).min(max_workers);
        let mut per_worker_rate_bps = Vec::with_capacity(active);
        for (id, hist) in per_worker_history.iter_mut().enumerate().take(active) {
            hist.push_back((now, counters.per_worker_bytes[id].load(Ordering::Relaxed)));
            prune_window(hist, now);
            per_worker_rate_bps.push(rate_from_window(hist));
        }

        let mut telemetry = telemetry_from(counters, active, max_workers);
        telemetry.total_rate_bps = total_rate_bps;
        telemetry.per_worker_rate_bps = per_worker_rate_bps;
        status.update_worker_telemetry(telemetry);

        if cancel.is_cancelled() || counters.remaining.load(Ordering::Relaxed) == 0 {
            return;
        }
    }
}

fn prune_window(history: &mut VecDeque<(Instant, u64)>, now: Instant) {
    while history
        .front()
        .map(|(t, _)| now.duration_since(*t) > SAMPLE_WINDOW)
        .unwrap_or(false)
    {
        history.pop_front();
    }
}

fn rate_from_window(history: &VecDeque<(Instant, u64)>) -> f64 {
    let (Some(&(t0, b0)), Some(&(t1, b1))) = (history.front(), history.back()) else {
        return 0.0;
    };
    if b1 < b0 {
        return 0.0;
    }
    let elapsed = t1.duration_since(t0).as_secs_f64();
    if elapsed <= 0.0 {
        return 0.0;
    }
    (b1 - b0) as f64 / elapsed
}

fn telemetry_from(counters: &Counters, active: usize, max: usize) -> WorkerTelemetry {
    let read_nanos = counters.read_nanos.load(Ordering::Relaxed);
    let write_nanos = counters.write_nanos.load(Ordering::Relaxed);
    let total_nanos = read_nanos + write_nanos;

    let (read_percent, write_percent) = if total_nanos == 0 {
        (0.0, 0.0)
    } else {
        (
            read_nanos as f64 / total_nanos as f64 * 100.0,
            write_nanos as f64 / total_nanos as f64 * 100.0,
        )
    };

    WorkerTelemetry {
        active_workers: active,
        max_workers: max,
        per_worker_rate_bps: Vec::new(),
        total_rate_bps: 0.0,
        read_percent,
        write_percent,
        bottleneck: bottleneck_of(counters),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::UNIX_EPOCH;

    #[test]
    fn copies_all_queued_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut tasks = Vec::new();
        for i in 0..10 {
            let src = dir.path().join(format!("src{i}.txt"));
            let dst = dir.path().join(format!("dst{i}.txt"));
            fs::write(&src, format!("content {i}")).unwrap();
            tasks.push(FileToSync::new(src, dst, format!("dst{i}.txt"), 9, UNIX_EPOCH));
        }

        let config = PoolConfig {
            workers: 3,
            ..PoolConfig::default()
        };
        let status = StatusStore::new();
        let events = EventBus::new(32);
        let cancel = CancelToken::new();

        let stats = run(tasks, &config, &cancel, &status, &events);

        assert_eq!(stats.processed, 10);
        assert_eq!(stats.failed, 0);
        for i in 0..10 {
            assert!(dir.path().join(format!("dst{i}.txt")).exists());
        }
    }

    #[test]
    fn adaptive_mode_still_completes_all_work() {
        let dir = tempfile::tempdir().unwrap();
        let mut tasks = Vec::new();
        for i in 0..20 {
            let src = dir.path().join(format!("src{i}.txt"));
            let dst = dir.path().join(format!("dst{i}.txt"));
            fs::write(&src, vec![7u8; 4096]).unwrap();
            tasks.push(FileToSync::new(src, dst, format!("dst{i}.txt"), 4096, UNIX_EPOCH));
        }

        let config = PoolConfig {
            workers: 2,
            max_workers: 4,
            adaptive: true,
            ..PoolConfig::default()
        };
        let status = StatusStore::new();
        let events = EventBus::new(32);
        let cancel = CancelToken::new();

        let stats = run(tasks, &config, &cancel, &status, &events);
        assert_eq!(stats.processed, 20);
    }

    #[test]
    fn empty_task_list_completes_immediately() {
        let config = PoolConfig::default();
        let status = StatusStore::new();
        let events = EventBus::new(32);
        let cancel = CancelToken::new();

        let stats = run(Vec::new(), &config, &cancel, &status, &events);
        assert_eq!(stats.processed, 0);
    }

    #[test]
    fn failed_copy_is_counted_not_panicked() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = vec![FileToSync::new(
            dir.path().join("missing.txt"),
            dir.path().join("dst.txt"),
            "dst.txt".into(),
            0,
            UNIX_EPOCH,
        )];

        let config = PoolConfig {
            workers: 2,
            ..PoolConfig::default()
        };
        let status = StatusStore::new();
        let events = EventBus::new(32);
        let cancel = CancelToken::new();

        let stats = run(tasks, &config, &cancel, &status, &events);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.out_of_space, None);
    }

    #[test]
    fn saturated_read_side_is_detected_above_85_percent() {
        let counters = Counters::new(2, 1);
        counters.read_nanos.store(900, Ordering::Relaxed);
        counters.write_nanos.store(100, Ordering::Relaxed);
        assert!(is_saturated(&counters));
    }

    #[test]
    fn balanced_load_is_not_saturated() {
        let counters = Counters::new(2, 1);
        counters.read_nanos.store(550, Ordering::Relaxed);
        counters.write_nanos.store(450, Ordering::Relaxed);
        assert!(!is_saturated(&counters));
    }

    #[test]
    fn controller_refuses_to_grow_a_saturated_side_even_when_balanced() {
        // A pathological case (classified Balanced by the 60% threshold but
        // already past the 85% saturation line) still must not grow.
        assert!(!should_grow(Bottleneck::Balanced, true, 2, 8, false));
        assert!(should_grow(Bottleneck::Balanced, false, 2, 8, false));
    }

    #[test]
    fn controller_does_not_grow_when_not_balanced_or_at_cap_or_stalled() {
        assert!(!should_grow(Bottleneck::SourceLimited, false, 2, 8, false));
        assert!(!should_grow(Bottleneck::Balanced, false, 8, 8, false));
        assert!(!should_grow(Bottleneck::Balanced, false, 2, 8, true));
    }

    #[test]
    fn two_consecutive_enospc_failures_trigger_fatal_cancellation() {
        let counters = Counters::new(2, 2);
        let cancel = CancelToken::new();
        let path = std::path::PathBuf::from("dst.txt");

        note_enospc(&counters, true, &path, &cancel);
        assert!(!cancel.is_cancelled());

        note_enospc(&counters, true, &path, &cancel);
        assert!(cancel.is_cancelled());
        assert_eq!(*counters.fatal_path.lock().unwrap(), Some(path));
    }

    #[test]
    fn non_enospc_result_resets_consecutive_counter() {
        let counters = Counters::new(2, 3);
        let cancel = CancelToken::new();
        let path = std::path::PathBuf::from("dst.txt");

        note_enospc(&counters, true, &path, &cancel);
        note_enospc(&counters, false, &path, &cancel);
        note_enospc(&counters, true, &path, &cancel);

        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn rate_from_window_computes_bytes_per_second() {
        let mut history = VecDeque::new();
        let t0 = Instant::now();
        history.push_back((t0, 0u64));
        history.push_back((t0 + Duration::from_secs(2), 200u64));
        assert!((rate_from_window(&history) - 100.0).abs() < 0.01);
    }

    #[test]
    fn rate_from_window_is_zero_with_fewer_than_two_samples() {
        let mut history = VecDeque::new();
        history.push_back((Instant::now(), 42u64));
        assert_eq!(rate_from_window(&history), 0.0);
    }
}
