//! Conflict detection between two branches.
//!
//! Branch entries are compared by name only. A commit id present in both the
//! source and the target is a conflict; contents are never inspected.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

/// A name collision between a source entry and a target entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// Entry name present in both branches, e.g. `commit-1`.
    pub entry: String,
    /// Source branch name.
    pub source: String,
    /// Target branch name.
    pub target: String,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' exists in both '{}' and '{}'",
            self.entry, self.source, self.target
        )
    }
}

/// What the merge should do with one source entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedEntry {
    /// No entry of that name in the target; copy it.
    Copy(String),
    /// The target has an entry of the same name; ask the operator.
    Conflict(Conflict),
}

/// Detects name collisions between branch entry lists.
pub struct ConflictDetector;

impl ConflictDetector {
    /// Plan a merge of `source_entries` into `target_entries`, preserving the
    /// order of the source.
    pub fn plan(
        source: &str,
        target: &str,
        source_entries: &[String],
        target_entries: &[String],
    ) -> Vec<PlannedEntry> {
        let existing: BTreeSet<&str> = target_entries.iter().map(String::as_str).collect();

        let plan: Vec<PlannedEntry> = source_entries
            .iter()
            .map(|entry| {
                if existing.contains(entry.as_str()) {
                    PlannedEntry::Conflict(Conflict {
                        entry: entry.clone(),
                        source: source.to_string(),
                        target: target.to_string(),
                    })
                } else {
                    PlannedEntry::Copy(entry.clone())
                }
            })
            .collect();

        debug!(
            entries = plan.len(),
            conflicts = plan
                .iter()
                .filter(|p| matches!(p, PlannedEntry::Conflict(_)))
                .count(),
            "planned merge"
        );
        plan
    }
}
