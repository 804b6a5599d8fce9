//! Merging one branch's commits into another.
//!
//! The merge subsystem is responsible for:
//! 1. **Requests** -- attaching an advisory note to a branch.
//! 2. **Detection** -- finding commit ids present on both sides.
//! 3. **Application** -- copying accepted or conflict-free commits, whole.

pub mod detector;

pub use detector::{Conflict, ConflictDetector, PlannedEntry};

use tracing::{debug, info, instrument};

use crate::errors::{MergeError, StoreError};
use crate::fsutil;
use crate::models::MergeReport;
use crate::operator::{Decision, Operator};
use crate::repo::Repository;
use crate::store::CONTROL_DIR;

/// Merge operations on branch storage. The workspace is never touched.
pub struct MergeEngine<'a> {
    repo: &'a Repository,
}

impl<'a> MergeEngine<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Record a note on `source` describing an intended merge into `target`.
    /// Overwrites any earlier note.
    #[instrument(skip(self, message))]
    pub fn merge_request(&self, source: &str, target: &str, message: &str) -> Result<(), StoreError> {
        let store = self.repo.store();
        store.branch_dir(target)?;
        let marker = store.marker_path(source)?;
        std::fs::write(&marker, message).map_err(|e| StoreError::io(&marker, e))?;
        info!(source, target, "recorded merge request");
        Ok(())
    }

    /// Copy the commits of `source` into `target`, asking `operator` about
    /// every commit id that exists on both sides.
    #[instrument(skip(self, operator))]
    pub fn merge(
        &self,
        source: &str,
        target: &str,
        operator: &mut dyn Operator,
    ) -> Result<MergeReport, MergeError> {
        let store = self.repo.store();
        let source_dir = store.branch_dir(source)?;
        let target_dir = store.branch_dir(target)?;

        let mut report = MergeReport {
            request_note: store.read_merge_request(source)?,
            ..MergeReport::default()
        };
        if let Some(ref note) = report.request_note {
            operator.show_merge_request(source, note);
        }

        let source_entries: Vec<String> = store
            .list_commits(source)?
            .into_iter()
            .filter(|name| name != CONTROL_DIR)
            .collect();
        let target_entries = store.list_commits(target)?;

        for planned in ConflictDetector::plan(source, target, &source_entries, &target_entries) {
            let entry = match planned {
                PlannedEntry::Copy(entry) => entry,
                PlannedEntry::Conflict(conflict) => match operator.decide(&conflict)? {
                    Decision::Accept => conflict.entry,
                    Decision::Skip => {
                        debug!(entry = %conflict.entry, "skipped conflicting entry");
                        report.skipped.push(conflict.entry);
                        continue;
                    }
                },
            };

            let staging = store.stage("merge-")?;
            let staged = staging.path().join(&entry);
            fsutil::copy_entry(&source_dir.join(&entry), &staged)?;

            let destination = target_dir.join(&entry);
            fsutil::remove_entry(&destination)?;
            fsutil::move_entry(&staged, &destination)?;

            debug!(entry = %entry, "merged entry");
            report.merged.push(entry);
        }

        info!(
            source,
            target,
            merged = report.merged.len(),
            skipped = report.skipped.len(),
            "merge complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{FixedOperator, ScriptedOperator};
    use crate::snapshot::SnapshotEngine;
    use std::path::Path;

    fn setup() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let repo = Repository::open(dir.path()).unwrap();
        repo.store().create_branch("dev").unwrap();
        (dir, repo)
    }

    fn commit_with(repo: &Repository, branch: &str, file: &str, content: &str) -> String {
        std::fs::write(repo.root().join(file), content).unwrap();
        SnapshotEngine::new(repo).commit(branch, content).unwrap()
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_merge_request_overwrites() {
        let (dir, repo) = setup();
        let engine = MergeEngine::new(&repo);
        engine.merge_request("dev", "main", "first note").unwrap();
        engine.merge_request("dev", "main", "second note").unwrap();
        assert_eq!(
            read(&dir.path().join(".giest/branches/dev/MERGE_REQUEST")),
            "second note"
        );
    }

    #[test]
    fn test_merge_request_requires_both_branches() {
        let (_dir, repo) = setup();
        let engine = MergeEngine::new(&repo);
        assert!(matches!(
            engine.merge_request("dev", "ghost", "x"),
            Err(StoreError::BranchNotFound(ref b)) if b == "ghost"
        ));
        assert!(matches!(
            engine.merge_request("ghost", "dev", "x"),
            Err(StoreError::BranchNotFound(ref b)) if b == "ghost"
        ));
    }

    #[test]
    fn test_merge_without_conflicts_copies_everything() {
        let (dir, repo) = setup();
        commit_with(&repo, "dev", "f.txt", "one");
        commit_with(&repo, "dev", "f.txt", "two");

        let mut op = ScriptedOperator::default();
        let report = MergeEngine::new(&repo).merge("dev", "main", &mut op).unwrap();

        assert_eq!(report.merged_count(), 2);
        assert!(op.asked.is_empty());
        let main = dir.path().join(".giest/branches/main");
        assert_eq!(read(&main.join("commit-2/f.txt")), "two");
        assert_eq!(read(&main.join("commit-1/message.txt")), "one");
    }

    #[test]
    fn test_merge_skip_keeps_target() {
        let (dir, repo) = setup();
        commit_with(&repo, "main", "f.txt", "main version");
        commit_with(&repo, "dev", "f.txt", "dev version");

        let mut op = ScriptedOperator::new(["n"]);
        let report = MergeEngine::new(&repo).merge("dev", "main", &mut op).unwrap();

        assert_eq!(report.merged_count(), 0);
        assert_eq!(report.skipped, vec!["commit-1"]);
        assert_eq!(
            read(&dir.path().join(".giest/branches/main/commit-1/f.txt")),
            "main version"
        );
    }

    #[test]
    fn test_merge_accept_replaces_target() {
        let (dir, repo) = setup();
        commit_with(&repo, "main", "only-main.txt", "main version");
        std::fs::remove_file(repo.root().join("only-main.txt")).unwrap();
        commit_with(&repo, "dev", "f.txt", "dev version");

        let mut op = ScriptedOperator::new(["maybe", "y"]);
        let report = MergeEngine::new(&repo).merge("dev", "main", &mut op).unwrap();

        assert_eq!(report.merged, vec!["commit-1"]);
        assert_eq!(op.rejected, vec!["maybe"]);
        let merged = dir.path().join(".giest/branches/main/commit-1");
        assert_eq!(read(&merged.join("f.txt")), "dev version");
        assert!(!merged.join("only-main.txt").exists());
    }

    #[test]
    fn test_merge_surfaces_request_note_without_copying_marker() {
        let (dir, repo) = setup();
        commit_with(&repo, "dev", "f.txt", "x");
        let engine = MergeEngine::new(&repo);
        engine.merge_request("dev", "main", "ready for main").unwrap();

        let mut op = FixedOperator::new(Decision::Accept);
        let report = engine.merge("dev", "main", &mut op).unwrap();

        assert_eq!(report.request_note.as_deref(), Some("ready for main"));
        assert_eq!(report.merged, vec!["commit-1"]);
        assert!(!dir.path().join(".giest/branches/main/MERGE_REQUEST").exists());
        assert!(dir.path().join(".giest/branches/dev/MERGE_REQUEST").exists());
    }

    #[test]
    fn test_merge_empty_source() {
        let (_dir, repo) = setup();
        let mut op = ScriptedOperator::default();
        let report = MergeEngine::new(&repo).merge("dev", "main", &mut op).unwrap();
        assert_eq!(report.merged_count(), 0);
    }

    #[test]
    fn test_merge_missing_branch() {
        let (_dir, repo) = setup();
        let mut op = ScriptedOperator::default();
        let result = MergeEngine::new(&repo).merge("dev", "ghost", &mut op);
        assert!(matches!(
            result,
            Err(MergeError::Store(StoreError::BranchNotFound(_)))
        ));
    }

    #[test]
    fn test_merge_does_not_touch_workspace() {
        let (dir, repo) = setup();
        commit_with(&repo, "dev", "f.txt", "dev");
        std::fs::write(dir.path().join("f.txt"), "local edit").unwrap();

        let mut op = ScriptedOperator::default();
        MergeEngine::new(&repo).merge("dev", "main", &mut op).unwrap();
        assert_eq!(read(&dir.path().join("f.txt")), "local edit");
    }
}
