//! Data types returned by the engines.

use chrono::{DateTime, Local};
use serde::Serialize;

/// Shown when a commit has no readable message file.
pub const NO_MESSAGE: &str = "no message provided";

/// One commit as listed by `history`.
#[derive(Debug, Clone, Serialize)]
pub struct CommitSummary {
    /// Commit id, e.g. `commit-3`.
    pub id: String,
    /// Filesystem creation time of the commit directory.
    pub created_at: DateTime<Local>,
    /// Contents of `message.txt`, `None` if missing or unreadable.
    pub message: Option<String>,
}

impl CommitSummary {
    pub fn message_or_placeholder(&self) -> &str {
        self.message.as_deref().unwrap_or(NO_MESSAGE)
    }
}

/// Outcome of `history`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", content = "commits", rename_all = "snake_case")]
pub enum History {
    /// The branch exists but holds no commits yet.
    Empty,
    Commits(Vec<CommitSummary>),
}

impl History {
    pub fn commits(&self) -> &[CommitSummary] {
        match self {
            History::Empty => &[],
            History::Commits(commits) => commits,
        }
    }
}

/// Outcome of a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Merge-request note found on the source branch.
    pub request_note: Option<String>,
    /// Entries copied into the target, in merge order.
    pub merged: Vec<String>,
    /// Conflicting entries the operator chose to skip.
    pub skipped: Vec<String>,
}

impl MergeReport {
    pub fn merged_count(&self) -> usize {
        self.merged.len()
    }
}

/// Outcome of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    /// URL actually cloned, after shorthand expansion.
    pub url: String,
    /// Text reported by the clone client.
    pub clone_output: String,
    /// Whether a root-level merge-request marker was carried over.
    pub marker_restored: bool,
}

/// English plural helper for operator messages: `pluralize(1, "entry", "entries")`.
pub fn pluralize<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 {
        singular
    } else {
        plural
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_message() {
        let summary = CommitSummary {
            id: "commit-1".into(),
            created_at: Local::now(),
            message: None,
        };
        assert_eq!(summary.message_or_placeholder(), NO_MESSAGE);
    }

    #[test]
    fn test_history_json_shape() {
        let json = serde_json::to_value(History::Empty).unwrap();
        assert_eq!(json["state"], "empty");

        let history = History::Commits(vec![CommitSummary {
            id: "commit-1".into(),
            created_at: Local::now(),
            message: Some("first".into()),
        }]);
        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json["state"], "commits");
        assert_eq!(json["commits"][0]["id"], "commit-1");
        assert_eq!(json["commits"][0]["message"], "first");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(0, "commit", "commits"), "commits");
        assert_eq!(pluralize(1, "commit", "commits"), "commit");
        assert_eq!(pluralize(2, "commit", "commits"), "commits");
    }
}
