//! # dirsync - one-shot directory mirroring
//!
//! Scans a source and destination tree, computes the minimal set of copies
//! and deletions needed to make the destination match the source, and
//! executes that plan with an adaptive worker pool.

pub mod comparator;
pub mod commands;
pub mod config;
pub mod copy;
pub mod deleter;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod matcher;
pub mod pool;
pub mod progress;
pub mod scanner;
pub mod status_store;
pub mod types;
pub mod ui;
pub mod util;

pub use config::{Cli, Config};
pub use engine::Engine;
pub use error::{Result, SyncError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
