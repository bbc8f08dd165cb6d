//! indicatif-backed progress rendering: a spinner during analysis, a byte
//! progress bar during the copy phase.

use crate::engine::Engine;
use crate::types::{Event, ScanTarget};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ProgressReporter {
    scan_bar: ProgressBar,
    transfer_bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let scan_bar = ProgressBar::new_spinner();
        scan_bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        let transfer_bar = ProgressBar::hidden();
        transfer_bar.set_style(
            ProgressStyle::with_template(
                "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );

        Self { scan_bar, transfer_bar }
    }

    /// Blocks the calling thread, rendering events and polled status from
    /// `engine` until the run reaches a terminal phase. Intended to run on
    /// its own thread while `Engine::analyze`/`sync` run on another.
    pub fn run(&self, engine: &Engine) {
        let (id, events) = engine.subscribe();
        self.scan_bar.enable_steady_tick(Duration::from_millis(100));

        loop {
            let terminal = match events.recv_timeout(Duration::from_millis(250)) {
                Ok(event) => self.handle_event(event),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => false,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => true,
            };

            let snapshot = engine.status();
            self.transfer_bar.set_position(snapshot.processed_bytes);

            if terminal || snapshot.phase.is_terminal() {
                break;
            }
        }

        engine.unsubscribe(id);
        self.scan_bar.finish_and_clear();
        self.transfer_bar.finish_and_clear();
    }

    /// Returns true once a terminal phase has been observed.
    fn handle_event(&self, event: Event) -> bool {
        match event {
            Event::ScanStarted { target } => {
                let label = match target {
                    ScanTarget::Source => "scanning source",
                    ScanTarget::Dest => "scanning destination",
                };
                self.scan_bar.set_message(label);
                false
            }
            Event::ScanComplete { count, .. } => {
                self.scan_bar.set_message(format!("scanned {count} entries"));
                false
            }
            Event::CompareComplete { plan } => {
                let total_bytes = plan.only_in_source_stats().bytes + plan.modified_stats().bytes;
                self.transfer_bar.set_length(total_bytes);
                self.transfer_bar.set_message("syncing");
                self.scan_bar.finish_and_clear();
                self.transfer_bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                false
            }
            Event::DeletionStarted => {
                self.transfer_bar.set_message("deleting stale files");
                false
            }
            Event::DeletionComplete { count } => {
                self.transfer_bar.set_message(format!("deleted {count} files, syncing"));
                false
            }
            Event::Error { path, cause } => {
                self.scan_bar.println(format!("error: {}: {cause}", path.display()));
                false
            }
            Event::PhaseChanged { to, .. } => to.is_terminal(),
            Event::CompareStarted | Event::FileProgress { .. } | Event::FileComplete { .. } => false,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
