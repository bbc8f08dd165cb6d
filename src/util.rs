//! Shared small helpers: the cancellation token used across every thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A single cancellable flag threaded through the scanner, workers, deleter,
/// and controller. Every blocking loop polls it between chunks/entries so
/// cancellation is observed within one I/O operation.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
