//! Terminal UI - an external collaborator that drives an `Engine` purely
//! through its public API (events + status polling). The engine has no
//! knowledge this module exists.

mod progress_bar;

pub use progress_bar::ProgressReporter;
