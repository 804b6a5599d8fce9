//! External reintegration: replace the workspace with a fresh clone while
//! keeping the control store.
//!
//! The procedure is strictly ordered:
//! 1. copy the whole repository root (control store included) to a snapshot
//!    outside the repository,
//! 2. empty the repository root,
//! 3. clone into it,
//! 4. copy the control store and a root-level merge marker back,
//! 5. delete the snapshot.
//!
//! The caller holds the repository lock throughout. Clearing the root unlinks
//! the lock file, so the restored control store is assembled beside the root,
//! the lock is moved onto its lock file, and only then is it renamed into
//! place.
//!
//! A failed clone does **not** restore the snapshot. The root is left as the
//! clone left it and the snapshot path is returned in the error.

pub mod client;
pub mod remote_url;

pub use client::{Cloner, GitCloner};
pub use remote_url::expand_shorthand;

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::errors::{FetchError, StoreError};
use crate::fsutil;
use crate::lock::RepoLock;
use crate::models::FetchReport;
use crate::operator::Operator;
use crate::repo::Repository;
use crate::store::{CONTROL_DIR, MERGE_MARKER};

/// Prefix of the snapshot directory created in the system temp dir.
pub const SNAPSHOT_PREFIX: &str = "giestro-fetch-";

/// Prefix of the holding directory the control store is rebuilt in.
const RESTORE_PREFIX: &str = ".giestro-restore-";

/// Runs `fetch` against one repository with a given clone client.
pub struct ReintegrationEngine<'a, C: Cloner> {
    repo: &'a Repository,
    cloner: C,
}

impl<'a, C: Cloner> ReintegrationEngine<'a, C> {
    pub fn new(repo: &'a Repository, cloner: C) -> Self {
        Self { repo, cloner }
    }

    /// Replace the workspace with a clone of `url_or_shorthand`. `lock` is the
    /// repository lock held by the caller; on success it sits on the restored
    /// control store.
    #[instrument(skip(self, operator, lock), fields(root = %self.repo.root().display()))]
    pub fn fetch(
        &self,
        url_or_shorthand: &str,
        operator: &mut dyn Operator,
        lock: &mut RepoLock,
    ) -> Result<FetchReport, FetchError> {
        let url = expand_shorthand(url_or_shorthand, &self.repo.config().fetch);
        let root = self.repo.root();

        let prompt = format!(
            "This replaces everything in {} with a clone of {}. Uncommitted work is lost.",
            root.display(),
            url
        );
        if !operator.confirm(&prompt)? {
            info!("fetch declined by operator");
            return Err(FetchError::Aborted);
        }

        let snapshot = self.take_snapshot()?;
        info!(snapshot = %snapshot.display(), "snapshot taken");

        let entries = fsutil::list_entries(root)
            .map_err(|e| degraded("clearing the workspace", &snapshot, e))?;
        for name in entries {
            fsutil::remove_entry(&root.join(&name))
                .map_err(|e| degraded("clearing the workspace", &snapshot, e))?;
        }

        let clone_output = match self.cloner.clone_into(&url, root) {
            Ok(output) => output,
            Err(e) => {
                warn!(
                    snapshot = %snapshot.display(),
                    "clone failed, repository root left as is and snapshot kept"
                );
                return Err(FetchError::CloneFailed {
                    url,
                    output: e.output,
                    snapshot,
                });
            }
        };

        let marker_restored = self
            .restore_control_state(&snapshot, lock)
            .map_err(|e| degraded("restoring the control store", &snapshot, e))?;

        if let Err(e) = fsutil::remove_entry(&snapshot) {
            warn!(error = %e, snapshot = %snapshot.display(), "could not delete fetch snapshot");
        }

        info!(%url, "fetch complete");
        Ok(FetchReport {
            url,
            clone_output,
            marker_restored,
        })
    }

    /// Copy every root entry into a new directory under the system temp dir.
    /// The directory is removed again if the copy fails.
    fn take_snapshot(&self) -> Result<PathBuf, StoreError> {
        let root = self.repo.root();
        let temp = std::env::temp_dir();
        let snapshot = tempfile::Builder::new()
            .prefix(SNAPSHOT_PREFIX)
            .tempdir()
            .map_err(|e| StoreError::io(&temp, e))?;

        for name in fsutil::list_entries(root)? {
            fsutil::copy_entry(&root.join(&name), &snapshot.path().join(&name))?;
        }
        Ok(snapshot.keep())
    }

    /// Put the control directory and a root-level marker back. Returns
    /// whether a marker was restored.
    fn restore_control_state(
        &self,
        snapshot: &Path,
        lock: &mut RepoLock,
    ) -> Result<bool, StoreError> {
        let root = self.repo.root();

        let control = root.join(CONTROL_DIR);
        if std::fs::symlink_metadata(&control).is_ok() {
            warn!("cloned tree carries its own {CONTROL_DIR}, replacing it");
            fsutil::remove_entry(&control)?;
        }

        let holding = tempfile::Builder::new()
            .prefix(RESTORE_PREFIX)
            .tempdir_in(root)
            .map_err(|e| StoreError::io(root, e))?;
        let staged = holding.path().join(CONTROL_DIR);
        fsutil::copy_entry(&snapshot.join(CONTROL_DIR), &staged)?;
        lock.relock(&staged)?;
        fsutil::move_entry(&staged, &control)?;
        let holding_path = holding.path().to_path_buf();
        holding
            .close()
            .map_err(|e| StoreError::io(&holding_path, e))?;

        let marker = snapshot.join(MERGE_MARKER);
        if std::fs::symlink_metadata(&marker).is_ok() {
            fsutil::remove_entry(&root.join(MERGE_MARKER))?;
            fsutil::copy_entry(&marker, &root.join(MERGE_MARKER))?;
            return Ok(true);
        }
        Ok(false)
    }
}

fn degraded(step: &'static str, snapshot: &Path, source: StoreError) -> FetchError {
    warn!(step, snapshot = %snapshot.display(), "fetch failed part way, snapshot kept");
    FetchError::Degraded {
        step,
        snapshot: snapshot.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CloneError;
    use crate::lock::RepoLock;
    use std::time::Duration;
    use crate::operator::ScriptedOperator;
    use crate::snapshot::SnapshotEngine;

    /// Writes a fixed file into the destination, like a tiny remote.
    struct FakeCloner;

    impl Cloner for FakeCloner {
        fn clone_into(&self, url: &str, dest: &Path) -> Result<String, CloneError> {
            std::fs::write(dest.join("README.md"), format!("cloned from {url}")).unwrap();
            Ok(format!("cloned {url}"))
        }
    }

    /// Writes one file, then fails.
    struct FailingCloner;

    impl Cloner for FailingCloner {
        fn clone_into(&self, _url: &str, dest: &Path) -> Result<String, CloneError> {
            std::fs::write(dest.join("partial"), "half").unwrap();
            Err(CloneError {
                output: "remote: repository not found".into(),
            })
        }
    }

    fn setup() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let repo = Repository::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("local.txt"), "local").unwrap();
        SnapshotEngine::new(&repo).commit("main", "before fetch").unwrap();
        (dir, repo)
    }

    #[test]
    fn test_fetch_replaces_workspace_and_keeps_history() {
        let (dir, repo) = setup();
        std::fs::write(dir.path().join("MERGE_REQUEST"), "root note").unwrap();

        let mut op = ScriptedOperator::new(["y"]);
        let mut lock = repo.lock().unwrap();
        let report = ReintegrationEngine::new(&repo, FakeCloner)
            .fetch("gh:acme/widgets", &mut op, &mut lock)
            .unwrap();

        assert_eq!(report.url, "https://github.com/acme/widgets.git");
        assert!(report.marker_restored);
        assert!(!dir.path().join("local.txt").exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("README.md")).unwrap(),
            "cloned from https://github.com/acme/widgets.git"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("MERGE_REQUEST")).unwrap(),
            "root note"
        );

        let history = SnapshotEngine::new(&repo).history("main").unwrap();
        assert_eq!(history.commits()[0].message.as_deref(), Some("before fetch"));
    }

    #[test]
    fn test_declined_fetch_changes_nothing() {
        let (dir, repo) = setup();
        let mut op = ScriptedOperator::new(["n"]);
        let mut lock = repo.lock().unwrap();
        let result =
            ReintegrationEngine::new(&repo, FakeCloner).fetch("gh:acme/widgets", &mut op, &mut lock);

        assert!(matches!(result, Err(FetchError::Aborted)));
        assert!(dir.path().join("local.txt").exists());
        assert!(!dir.path().join("README.md").exists());
    }

    #[test]
    fn test_clone_failure_leaves_root_degraded_and_keeps_snapshot() {
        let (dir, repo) = setup();
        let mut op = ScriptedOperator::new(["yes"]);
        let mut lock = repo.lock().unwrap();
        let err = ReintegrationEngine::new(&repo, FailingCloner)
            .fetch("https://example.invalid/x.git", &mut op, &mut lock)
            .unwrap_err();

        let snapshot = err.snapshot().expect("snapshot path").to_path_buf();
        match err {
            FetchError::CloneFailed { ref output, ref url, .. } => {
                assert_eq!(output, "remote: repository not found");
                assert_eq!(url, "https://example.invalid/x.git");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Known gap: nothing is restored after a failed clone.
        assert!(!dir.path().join(".giest").exists());
        assert!(!dir.path().join("local.txt").exists());
        assert!(dir.path().join("partial").exists());

        // The snapshot still holds the full pre-fetch state.
        assert!(snapshot.join(".giest/branches/main/commit-1").is_dir());
        assert_eq!(
            std::fs::read_to_string(snapshot.join("local.txt")).unwrap(),
            "local"
        );
        std::fs::remove_dir_all(snapshot).unwrap();
    }

    #[test]
    fn test_lock_held_on_restored_control_store() {
        let (dir, repo) = setup();
        let mut op = ScriptedOperator::new(["y"]);
        let mut lock = repo.lock().unwrap();
        ReintegrationEngine::new(&repo, FakeCloner)
            .fetch("gh:acme/widgets", &mut op, &mut lock)
            .unwrap();

        assert!(matches!(
            RepoLock::acquire(repo.control_dir(), Duration::from_millis(20)),
            Err(StoreError::Locked(_))
        ));
        let leftovers: Vec<_> = fsutil::list_entries(dir.path())
            .unwrap()
            .into_iter()
            .filter(|name| name.to_string_lossy().starts_with(RESTORE_PREFIX))
            .collect();
        assert!(leftovers.is_empty());

        drop(lock);
        let _again = RepoLock::acquire(repo.control_dir(), Duration::from_millis(20)).unwrap();
    }
}
