//! SyncPlan - the immutable output of the comparator.

use super::record::FileRecord;
use std::sync::Arc;

/// A file present on only one side, or present on both but out of date.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub relpath: String,
    pub record: FileRecord,
}

/// Aggregate counts for one of the plan's four sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetStats {
    pub files: usize,
    pub bytes: u64,
}

/// The four-way classification produced by comparing two scans.
///
/// Immutable after [`crate::comparator::compare`] builds it. `only_in_source`
/// and `modified` together are the set of files the copy pipeline must write;
/// `only_in_dest` is what the deleter may remove; `in_both` is already in sync.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub only_in_source: Vec<PlanEntry>,
    pub only_in_dest: Vec<PlanEntry>,
    pub modified: Vec<PlanEntry>,
    pub in_both: Vec<PlanEntry>,
}

impl SyncPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only_in_source_stats(&self) -> SetStats {
        stats_of(&self.only_in_source)
    }

    pub fn only_in_dest_stats(&self) -> SetStats {
        stats_of(&self.only_in_dest)
    }

    pub fn modified_stats(&self) -> SetStats {
        stats_of(&self.modified)
    }

    pub fn in_both_stats(&self) -> SetStats {
        stats_of(&self.in_both)
    }

    /// Entries that the copy pipeline must write: new files plus modified ones.
    pub fn to_copy(&self) -> impl Iterator<Item = &PlanEntry> {
        self.only_in_source.iter().chain(self.modified.iter())
    }

    pub fn sort_by_path(&mut self) {
        self.only_in_source.sort_by(|a, b| a.relpath.cmp(&b.relpath));
        self.only_in_dest.sort_by(|a, b| a.relpath.cmp(&b.relpath));
        self.modified.sort_by(|a, b| a.relpath.cmp(&b.relpath));
        self.in_both.sort_by(|a, b| a.relpath.cmp(&b.relpath));
    }
}

fn stats_of(entries: &[PlanEntry]) -> SetStats {
    SetStats {
        files: entries.len(),
        bytes: entries.iter().map(|e| e.record.size).sum(),
    }
}

/// Shared handle stored in [`crate::types::Status`] once analysis completes.
pub type SharedPlan = Arc<SyncPlan>;
