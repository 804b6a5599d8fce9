//! The on-disk control store.
//!
//! Layout, relative to the repository root:
//!
//! ```text
//! .giest/
//!   config.toml
//!   giestro.lock
//!   tmp/                      staging area
//!   branches/
//!     <branch>/
//!       MERGE_REQUEST         optional merge-request note
//!       commit-<n>/
//!         message.txt
//!         <copied workspace entries>
//! ```

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info};

use crate::errors::StoreError;
use crate::fsutil;

/// Name of the control directory at the repository root.
pub const CONTROL_DIR: &str = ".giest";
/// Directory holding one sub-directory per branch.
pub const BRANCHES_DIR: &str = "branches";
/// Staging area for trees being assembled before they are moved into place.
pub const STAGING_DIR: &str = "tmp";
/// Pending-merge marker file name.
pub const MERGE_MARKER: &str = "MERGE_REQUEST";
/// Commit message file inside every commit directory.
pub const MESSAGE_FILE: &str = "message.txt";
/// Branch created by `init`.
pub const DEFAULT_BRANCH: &str = "main";

const COMMIT_PREFIX: &str = "commit-";

/// Result of [`ControlStore::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    AlreadyInitialized,
}

/// Handle on the `.giest` directory of one repository.
#[derive(Debug, Clone)]
pub struct ControlStore {
    dir: PathBuf,
}

impl ControlStore {
    /// Control store for the repository rooted at `root`.
    pub fn for_root(root: &Path) -> Self {
        Self {
            dir: root.join(CONTROL_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn branches_dir(&self) -> PathBuf {
        self.dir.join(BRANCHES_DIR)
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Create the control directory, the branches area and the default branch.
    /// Does nothing when the control directory already exists.
    pub fn initialize(&self) -> Result<InitOutcome, StoreError> {
        if self.exists() {
            debug!(dir = %self.dir.display(), "control store already present");
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let default_branch = self.branches_dir().join(DEFAULT_BRANCH);
        std::fs::create_dir_all(&default_branch)
            .map_err(|e| StoreError::io(&default_branch, e))?;

        info!(dir = %self.dir.display(), "initialized control store");
        Ok(InitOutcome::Created)
    }

    /// Fail with [`StoreError::NotInitialized`] when the control directory is absent.
    pub fn ensure_initialized(&self) -> Result<(), StoreError> {
        if self.exists() {
            Ok(())
        } else {
            Err(StoreError::NotInitialized(self.dir.clone()))
        }
    }

    // -----------------------------------------------------------------------
    // Branches
    // -----------------------------------------------------------------------

    /// Names of all branches currently on disk, sorted.
    pub fn list_branches(&self) -> Result<Vec<String>, StoreError> {
        let branches_dir = self.branches_dir();
        let mut names = Vec::new();
        for name in fsutil::list_entries(&branches_dir)? {
            if branches_dir.join(&name).is_dir() {
                names.push(name.to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    /// Create an empty branch.
    pub fn create_branch(&self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        let dir = self.branches_dir().join(name);
        if dir.exists() {
            return Err(StoreError::BranchAlreadyExists(name.to_string()));
        }
        std::fs::create_dir(&dir).map_err(|e| StoreError::io(&dir, e))?;
        info!(branch = name, "created branch");
        Ok(())
    }

    /// Delete a branch and every commit in it.
    pub fn remove_branch(&self, name: &str) -> Result<(), StoreError> {
        let dir = self.branch_dir(name)?;
        fsutil::remove_entry(&dir)?;
        info!(branch = name, "removed branch");
        Ok(())
    }

    /// Path of an existing branch.
    pub fn branch_dir(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        let dir = self.branches_dir().join(name);
        if !dir.is_dir() {
            return Err(StoreError::BranchNotFound(name.to_string()));
        }
        Ok(dir)
    }

    // -----------------------------------------------------------------------
    // Commits
    // -----------------------------------------------------------------------

    /// Path of an existing commit in an existing branch.
    pub fn commit_dir(&self, branch: &str, commit: &str) -> Result<PathBuf, StoreError> {
        let branch_dir = self.branch_dir(branch)?;
        validate_name(commit)?;
        let dir = branch_dir.join(commit);
        if !dir.is_dir() {
            return Err(StoreError::CommitNotFound {
                branch: branch.to_string(),
                commit: commit.to_string(),
            });
        }
        Ok(dir)
    }

    /// Entry names stored in a branch, marker excluded, in commit order.
    pub fn list_commits(&self, branch: &str) -> Result<Vec<String>, StoreError> {
        let branch_dir = self.branch_dir(branch)?;
        let mut names: Vec<String> = fsutil::list_entries(&branch_dir)?
            .into_iter()
            .filter(|name| name.as_os_str() != OsStr::new(MERGE_MARKER))
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        names.sort_by_key(|name| (commit_number(name).unwrap_or(u64::MAX), name.clone()));
        Ok(names)
    }

    /// Id the next commit in `branch` will get: one more than the number of
    /// commit entries present now. Deleting a commit lowers the count, so the
    /// result can name a commit that still exists.
    pub fn next_commit_id(&self, branch: &str) -> Result<String, StoreError> {
        let count = self.list_commits(branch)?.len();
        Ok(format!("{}{}", COMMIT_PREFIX, count + 1))
    }

    // -----------------------------------------------------------------------
    // Merge-request marker
    // -----------------------------------------------------------------------

    /// Path of the merge-request marker of an existing branch.
    pub fn marker_path(&self, branch: &str) -> Result<PathBuf, StoreError> {
        Ok(self.branch_dir(branch)?.join(MERGE_MARKER))
    }

    /// Note stored in the branch's merge-request marker, if any.
    pub fn read_merge_request(&self, branch: &str) -> Result<Option<String>, StoreError> {
        let path = self.marker_path(branch)?;
        match std::fs::read_to_string(&path) {
            Ok(note) => Ok(Some(note)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    // -----------------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------------

    /// A fresh staging directory inside the control store. It is removed when
    /// the returned guard is dropped.
    pub fn stage(&self, prefix: &str) -> Result<TempDir, StoreError> {
        let staging = self.dir.join(STAGING_DIR);
        std::fs::create_dir_all(&staging).map_err(|e| StoreError::io(&staging, e))?;
        tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&staging)
            .map_err(|e| StoreError::io(&staging, e))
    }
}

/// Numeric suffix of a `commit-<n>` id.
pub fn commit_number(id: &str) -> Option<u64> {
    id.strip_prefix(COMMIT_PREFIX)?.parse().ok()
}

/// Whether a top-level entry name belongs to the tool rather than the workspace.
pub fn is_control_entry(name: &OsStr) -> bool {
    name == OsStr::new(CONTROL_DIR) || name == OsStr::new(MERGE_MARKER)
}

/// Branch names and commit ids must be a single plain path component.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || name.contains(['/', '\\']) || name == MERGE_MARKER {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}
