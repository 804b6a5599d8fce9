//! Snapshot engine: capture the workspace into a commit and restore it.
//!
//! Both directions assemble the new tree in the staging area first and only
//! then touch the destination, so a failed copy never leaves a half-written
//! commit or a half-cleared workspace behind.

use std::ffi::OsStr;
use std::path::Path;

use chrono::{DateTime, Local};
use tracing::{debug, info, instrument};

use crate::errors::StoreError;
use crate::fsutil;
use crate::models::{CommitSummary, History};
use crate::repo::Repository;
use crate::store::{CONTROL_DIR, MERGE_MARKER, MESSAGE_FILE};

/// Commit, rollback, removal and history for one repository.
pub struct SnapshotEngine<'a> {
    repo: &'a Repository,
}

impl<'a> SnapshotEngine<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Capture the workspace as the next commit of `branch`.
    #[instrument(skip(self, message), fields(root = %self.repo.root().display()))]
    pub fn commit(&self, branch: &str, message: &str) -> Result<String, StoreError> {
        let store = self.repo.store();
        let branch_dir = store.branch_dir(branch)?;
        let commit_id = store.next_commit_id(branch)?;

        let target = branch_dir.join(&commit_id);
        if target.exists() {
            return Err(StoreError::CommitCollision {
                branch: branch.to_string(),
                commit: commit_id,
            });
        }

        let entries = self.repo.workspace_entries()?;
        if entries.iter().any(|name| name.as_os_str() == OsStr::new(MESSAGE_FILE)) {
            return Err(StoreError::ReservedName(MESSAGE_FILE.to_string()));
        }

        let staging = store.stage("commit-")?;
        let staged = staging.path().join(&commit_id);
        std::fs::create_dir(&staged).map_err(|e| StoreError::io(&staged, e))?;

        for name in entries {
            fsutil::copy_entry(&self.repo.root().join(&name), &staged.join(&name))?;
        }

        let message_path = staged.join(MESSAGE_FILE);
        std::fs::write(&message_path, message).map_err(|e| StoreError::io(&message_path, e))?;

        fsutil::move_entry(&staged, &target)?;
        info!(branch, commit = %commit_id, "created commit");
        Ok(commit_id)
    }

    /// Replace the workspace with the contents of `commit_id`.
    ///
    /// Returns the number of top-level entries restored. Nothing in the
    /// workspace is touched unless the branch and commit exist and the commit
    /// was copied to staging in full.
    #[instrument(skip(self), fields(root = %self.repo.root().display()))]
    pub fn rollback(&self, branch: &str, commit_id: &str) -> Result<usize, StoreError> {
        let store = self.repo.store();
        let commit_dir = store.commit_dir(branch, commit_id)?;

        let staging = store.stage("rollback-")?;
        let restore: Vec<_> = fsutil::list_entries(&commit_dir)?
            .into_iter()
            .filter(|name| !is_excluded_from_restore(name))
            .collect();
        for name in &restore {
            fsutil::copy_entry(&commit_dir.join(name), &staging.path().join(name))?;
        }
        debug!(entries = restore.len(), "staged commit contents");

        let root = self.repo.root();
        for name in self.repo.root_entries_except_control()? {
            fsutil::remove_entry(&root.join(&name))?;
        }
        for name in &restore {
            fsutil::move_entry(&staging.path().join(name), &root.join(name))?;
        }

        info!(branch, commit = commit_id, entries = restore.len(), "rolled back workspace");
        Ok(restore.len())
    }

    /// Delete a single commit. Other commits keep their ids.
    #[instrument(skip(self))]
    pub fn remove(&self, branch: &str, commit_id: &str) -> Result<(), StoreError> {
        let commit_dir = self.repo.store().commit_dir(branch, commit_id)?;
        fsutil::remove_entry(&commit_dir)?;
        info!(branch, commit = commit_id, "removed commit");
        Ok(())
    }

    /// List the commits of `branch` in commit order.
    pub fn history(&self, branch: &str) -> Result<History, StoreError> {
        let store = self.repo.store();
        let branch_dir = store.branch_dir(branch)?;
        let ids = store.list_commits(branch)?;
        if ids.is_empty() {
            return Ok(History::Empty);
        }

        let mut commits = Vec::with_capacity(ids.len());
        for id in ids {
            let dir = branch_dir.join(&id);
            commits.push(CommitSummary {
                created_at: created_at(&dir)?,
                message: read_message(&dir),
                id,
            });
        }
        Ok(History::Commits(commits))
    }
}

/// Entries inside a commit that never go back into the workspace. Commits
/// should not contain the control directory or the marker; they are skipped
/// anyway in case one was merged in from branch storage.
fn is_excluded_from_restore(name: &OsStr) -> bool {
    name == OsStr::new(MESSAGE_FILE)
        || name == OsStr::new(CONTROL_DIR)
        || name == OsStr::new(MERGE_MARKER)
}

fn created_at(dir: &Path) -> Result<DateTime<Local>, StoreError> {
    let meta = std::fs::metadata(dir).map_err(|e| StoreError::io(dir, e))?;
    let time = meta
        .created()
        .or_else(|_| meta.modified())
        .map_err(|e| StoreError::io(dir, e))?;
    Ok(DateTime::<Local>::from(time))
}

fn read_message(dir: &Path) -> Option<String> {
    std::fs::read_to_string(dir.join(MESSAGE_FILE)).ok()
}
