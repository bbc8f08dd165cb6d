//! C3 - comparator: turns two scans into a `SyncPlan`.

use crate::types::{FileRecord, PlanEntry, SyncPlan};
use std::collections::HashMap;
use std::time::Duration;

/// Source is considered newer than dest once it exceeds this by more than
/// one second, since filesystems commonly truncate mtime precision.
const MTIME_TOLERANCE: Duration = Duration::from_secs(1);

/// Classifies every path seen in either scan into one of the plan's four
/// sets. Deterministic given the two record sets; does no I/O itself.
pub fn compare(source: Vec<FileRecord>, dest: Vec<FileRecord>) -> SyncPlan {
    let dest_by_path: HashMap<&str, &FileRecord> =
        dest.iter().map(|r| (r.relpath.as_str(), r)).collect();
    let mut seen_in_source = std::collections::HashSet::with_capacity(source.len());

    let mut plan = SyncPlan::new();

    for src_record in &source {
        seen_in_source.insert(src_record.relpath.as_str());
        match dest_by_path.get(src_record.relpath.as_str()) {
            None => plan.only_in_source.push(PlanEntry {
                relpath: src_record.relpath.clone(),
                record: src_record.clone(),
            }),
            Some(dest_record) => {
                if is_modified(src_record, dest_record) {
                    plan.modified.push(PlanEntry {
                        relpath: src_record.relpath.clone(),
                        record: src_record.clone(),
                    });
                } else {
                    plan.in_both.push(PlanEntry {
                        relpath: src_record.relpath.clone(),
                        record: src_record.clone(),
                    });
                }
            }
        }
    }

    for dest_record in &dest {
        if !seen_in_source.contains(dest_record.relpath.as_str()) {
            plan.only_in_dest.push(PlanEntry {
                relpath: dest_record.relpath.clone(),
                record: dest_record.clone(),
            });
        }
    }

    plan.sort_by_path();
    plan
}

fn is_modified(src: &FileRecord, dest: &FileRecord) -> bool {
    if src.is_symlink != dest.is_symlink {
        return true;
    }
    if src.is_symlink {
        return src.symlink_target != dest.symlink_target;
    }
    if src.size != dest.size {
        return true;
    }
    match src.mtime.duration_since(dest.mtime) {
        Ok(delta) => delta > MTIME_TOLERANCE,
        Err(_) => false, // source is not newer than dest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn rec(path: &str, size: u64, secs: u64) -> FileRecord {
        FileRecord::new(path.to_string(), size, UNIX_EPOCH + Duration::from_secs(secs), 0o644)
    }

    #[test]
    fn new_file_is_only_in_source() {
        let plan = compare(vec![rec("a.txt", 5, 100)], vec![]);
        assert_eq!(plan.only_in_source.len(), 1);
        assert!(plan.only_in_dest.is_empty());
        assert!(plan.modified.is_empty());
    }

    #[test]
    fn stale_dest_file_is_only_in_dest() {
        let plan = compare(vec![], vec![rec("stale.txt", 5, 100)]);
        assert_eq!(plan.only_in_dest.len(), 1);
    }

    #[test]
    fn identical_files_are_in_both() {
        let plan = compare(vec![rec("x", 5, 100)], vec![rec("x", 5, 100)]);
        assert_eq!(plan.in_both.len(), 1);
        assert!(plan.modified.is_empty());
    }

    #[test]
    fn size_difference_is_modified() {
        let plan = compare(vec![rec("x", 10, 100)], vec![rec("x", 5, 100)]);
        assert_eq!(plan.modified.len(), 1);
    }

    #[test]
    fn newer_mtime_beyond_tolerance_is_modified() {
        let plan = compare(vec![rec("x", 5, 110)], vec![rec("x", 5, 100)]);
        assert_eq!(plan.modified.len(), 1);
    }

    #[test]
    fn mtime_within_one_second_tolerance_is_in_both() {
        let plan = compare(vec![rec("x", 5, 100)], vec![rec("x", 5, 100)]);
        assert_eq!(plan.in_both.len(), 1);
        assert!(plan.modified.is_empty());
    }

    #[test]
    fn dest_newer_than_source_is_not_modified() {
        let plan = compare(vec![rec("x", 5, 100)], vec![rec("x", 5, 200)]);
        assert!(plan.modified.is_empty());
        assert_eq!(plan.in_both.len(), 1);
    }

    #[test]
    fn swapping_source_and_dest_swaps_only_sets() {
        let source = vec![rec("a", 1, 1), rec("shared", 2, 2)];
        let dest = vec![rec("b", 1, 1), rec("shared", 2, 2)];

        let forward = compare(source.clone(), dest.clone());
        let backward = compare(dest, source);

        assert_eq!(forward.only_in_source.len(), backward.only_in_dest.len());
        assert_eq!(forward.only_in_dest.len(), backward.only_in_source.len());
    }
}
