//! C5 - event bus: lossy publication of lifecycle and progress events.
//!
//! Progress events are dropped the instant a subscriber's queue is full.
//! Lifecycle events (`*Started`, `*Complete`, `PhaseChanged`, `Error`) get a
//! short grace period before they too are dropped - this bus must never let
//! a slow observer stall the engine. With no subscribers, everything is
//! discarded silently.

use crate::types::Event;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const DEFAULT_CAPACITY: usize = 128;
const LIFECYCLE_GRACE: Duration = Duration::from_millis(200);

pub type EventStream = Receiver<Event>;

struct Subscriber {
    id: u64,
    tx: Sender<Event>,
}

pub struct EventBus {
    capacity: usize,
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    dropped: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> (u64, EventStream) {
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers.lock().expect("event bus poisoned").push(Subscriber { id, tx });
        (id, rx)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.subscribers
            .lock()
            .expect("event bus poisoned")
            .retain(|s| s.id != id);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn publish(&self, event: Event) {
        let is_progress = matches!(event, Event::FileProgress { .. });
        let mut subs = self.subscribers.lock().expect("event bus poisoned");
        if subs.is_empty() {
            return;
        }

        subs.retain_mut(|sub| {
            let outcome = if is_progress {
                sub.tx.try_send(event.clone())
            } else {
                sub.tx.send_timeout(event.clone(), LIFECYCLE_GRACE).map_err(|e| match e {
                    crossbeam_channel::SendTimeoutError::Timeout(ev) => {
                        crossbeam_channel::TrySendError::Full(ev)
                    }
                    crossbeam_channel::SendTimeoutError::Disconnected(ev) => {
                        crossbeam_channel::TrySendError::Disconnected(ev)
                    }
                })
            };

            match outcome {
                Ok(()) => true,
                Err(crossbeam_channel::TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    true
                }
                Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
            }
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
