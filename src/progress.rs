//! C10 - progress calculator: pure derivation of percentages and ETA.

use crate::types::StatusSnapshot;
use std::time::Duration;

const FILES_WEIGHT: f64 = 0.3;
const BYTES_WEIGHT: f64 = 0.7;

#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressReport {
    pub files_percent: f64,
    pub bytes_percent: f64,
    pub time_percent: f64,
    pub overall_percent: f64,
    pub estimated_time_remaining: Duration,
    pub is_counting: bool,
}

/// Derives a progress report from a status snapshot. Every division guards
/// against zero denominators and returns 0.0 rather than NaN.
pub fn calculate(snapshot: &StatusSnapshot, elapsed: Duration) -> ProgressReport {
    use crate::types::Phase;

    let is_counting = matches!(
        snapshot.phase,
        Phase::Idle | Phase::CountingSource | Phase::CountingDest
    );

    let files_percent = ratio_percent(snapshot.processed_files, snapshot.total_files);
    let bytes_percent = ratio_percent(snapshot.processed_bytes, snapshot.total_bytes);
    let overall_percent = files_percent * FILES_WEIGHT + bytes_percent * BYTES_WEIGHT;

    let eta = estimate_remaining(snapshot.processed_bytes, snapshot.total_bytes, elapsed);
    let time_percent = time_percent_of(elapsed, eta);

    ProgressReport {
        files_percent,
        bytes_percent,
        time_percent,
        overall_percent,
        estimated_time_remaining: eta,
        is_counting,
    }
}

fn ratio_percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (done as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// Elapsed time as a percentage of elapsed-plus-remaining (the estimated
/// total run time). 0.0 until there's enough signal to estimate anything.
fn time_percent_of(elapsed: Duration, eta: Duration) -> f64 {
    let total = elapsed + eta;
    if total.is_zero() {
        0.0
    } else {
        (elapsed.as_secs_f64() / total.as_secs_f64() * 100.0).clamp(0.0, 100.0)
    }
}

fn estimate_remaining(done_bytes: u64, total_bytes: u64, elapsed: Duration) -> Duration {
    if elapsed < Duration::from_secs(1) || done_bytes == 0 || total_bytes <= done_bytes {
        return Duration::ZERO;
    }
    let rate = done_bytes as f64 / elapsed.as_secs_f64();
    if rate <= 0.0 {
        return Duration::ZERO;
    }
    let remaining_bytes = (total_bytes - done_bytes) as f64;
    Duration::from_secs_f64(remaining_bytes / rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Phase, Status};

    fn status(processed_files: u64, total_files: u64, processed_bytes: u64, total_bytes: u64) -> Status {
        Status {
            phase: Phase::Copying,
            processed_files,
            total_files,
            processed_bytes,
            total_bytes,
            ..Status::default()
        }
    }

    #[test]
    fn zero_totals_never_divide_by_zero() {
        let snap = status(0, 0, 0, 0);
        let report = calculate(&snap, Duration::from_secs(5));
        assert_eq!(report.files_percent, 0.0);
        assert_eq!(report.bytes_percent, 0.0);
        assert_eq!(report.estimated_time_remaining, Duration::ZERO);
    }

    #[test]
    fn halfway_bytes_gives_fifty_percent() {
        let snap = status(5, 10, 500, 1000);
        let report = calculate(&snap, Duration::from_secs(10));
        assert_eq!(report.bytes_percent, 50.0);
        assert_eq!(report.files_percent, 50.0);
        assert_eq!(report.overall_percent, 50.0);
    }

    #[test]
    fn eta_is_zero_below_one_second_of_samples() {
        let snap = status(1, 10, 100, 1000);
        let report = calculate(&snap, Duration::from_millis(500));
        assert_eq!(report.estimated_time_remaining, Duration::ZERO);
    }

    #[test]
    fn counting_phase_is_flagged() {
        let mut snap = status(0, 0, 0, 0);
        snap.phase = Phase::CountingSource;
        let report = calculate(&snap, Duration::from_secs(1));
        assert!(report.is_counting);
    }

    #[test]
    fn overall_percent_is_monotonic_as_bytes_progress() {
        let early = calculate(&status(1, 10, 100, 1000), Duration::from_secs(2));
        let later = calculate(&status(5, 10, 500, 1000), Duration::from_secs(2));
        assert!(later.overall_percent >= early.overall_percent);
    }

    #[test]
    fn time_percent_reflects_elapsed_share_of_estimated_total() {
        // rate = 500B / 10s = 50 B/s, 500B remaining => eta = 10s, total = 20s.
        let snap = status(5, 10, 500, 1000);
        let report = calculate(&snap, Duration::from_secs(10));
        assert!((report.time_percent - 50.0).abs() < 0.01);
    }

    #[test]
    fn time_percent_is_hundred_when_nothing_remains() {
        let snap = status(10, 10, 1000, 1000);
        let report = calculate(&snap, Duration::from_secs(5));
        assert_eq!(report.time_percent, 100.0);
    }

    #[test]
    fn time_percent_is_zero_with_no_elapsed_time_and_no_estimate() {
        let snap = status(0, 0, 0, 0);
        let report = calculate(&snap, Duration::ZERO);
        assert_eq!(report.time_percent, 0.0);
    }
}
