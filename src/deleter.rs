//! C6 - deleter: removes destination files that have no source counterpart.

use crate::events::EventBus;
use crate::status_store::StatusStore;
use crate::types::{Event, PlanEntry};
use crate::util::CancelToken;
use std::path::Path;

/// Removes every file in `only_in_dest` from under `dest_root`. Runs
/// sequentially on one thread; never removes directories, which can leave
/// empty directories behind (an accepted, documented limitation). Per-file
/// errors are recorded and deletion continues.
pub fn delete(
    dest_root: &Path,
    only_in_dest: &[PlanEntry],
    cancel: &CancelToken,
    status: &StatusStore,
    events: &EventBus,
) -> u64 {
    events.publish(Event::DeletionStarted);

    let mut deleted = 0u64;

    for entry in only_in_dest {
        if cancel.is_cancelled() {
            break;
        }

        status.mark_deletion_started(&entry.relpath);
        let abs_path = dest_root.join(&entry.relpath);

        let result = std::fs::remove_file(&abs_path);

        match result {
            Ok(()) => {
                status.mark_deletion_complete(&entry.relpath, true, entry.record.size);
                deleted += 1;
            }
            Err(err) => {
                status.record_error(abs_path.clone(), err.to_string());
                status.mark_deletion_complete(&entry.relpath, false, 0);
                events.publish(Event::Error {
                    path: abs_path,
                    cause: err.to_string(),
                });
            }
        }
    }

    events.publish(Event::DeletionComplete { count: deleted });
    deleted
}
