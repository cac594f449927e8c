//! Snapshot diffing.
//!
//! Compares the newly built snapshot against the last known one. Each check
//! is evaluated independently, so one cycle can yield several records.

use deploywatch_core::{ChangeRecord, Snapshot};

/// Change records between `previous` and `current`, in a fixed order:
/// status, heading, design. No previous snapshot means no changes.
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> Vec<ChangeRecord> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let mut changes = Vec::new();

    if previous.status != current.status {
        changes.push(ChangeRecord::status(previous.status, current.status));
    }

    if let (Some(before), Some(after)) = (&previous.content, &current.content) {
        if before.heading != after.heading {
            changes.push(ChangeRecord::content("heading", &before.heading, &after.heading));
        }
        if before.is_modern_design != after.is_modern_design {
            changes.push(ChangeRecord::design(
                before.is_modern_design,
                after.is_modern_design,
            ));
        }
    }

    changes
}
