//! Repository handle.
//!
//! A [`Repository`] is built once per invocation from the working directory
//! and passed to every engine.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{RepoConfig, CONFIG_FILE};
use crate::errors::{CoreError, StoreError};
use crate::fsutil;
use crate::lock::RepoLock;
use crate::store::{self, ControlStore, InitOutcome, CONTROL_DIR};

/// A working directory together with its control store.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
    store: ControlStore,
    config: RepoConfig,
}

impl Repository {
    /// Open the repository rooted at `root`. Fails with
    /// [`StoreError::NotInitialized`] when there is no control directory.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, CoreError> {
        let root = root.as_ref().to_path_buf();
        let store = ControlStore::for_root(&root);
        store.ensure_initialized()?;

        let config = RepoConfig::load_or_default(store.dir().join(CONFIG_FILE))?;
        debug!(root = %root.display(), "opened repository");
        Ok(Self {
            root,
            store,
            config,
        })
    }

    /// Open the repository at the current working directory.
    pub fn open_current_dir() -> Result<Self, CoreError> {
        let cwd = std::env::current_dir().map_err(|e| StoreError::io(".", e))?;
        Self::open(cwd)
    }

    /// Create the control store at `root` (with a default `config.toml`) if
    /// it is missing.
    pub fn init<P: AsRef<Path>>(root: P) -> Result<InitOutcome, CoreError> {
        let root = root.as_ref();
        let store = ControlStore::for_root(root);
        let outcome = store.initialize()?;

        if outcome == InitOutcome::Created {
            let config_path = store.dir().join(CONFIG_FILE);
            std::fs::write(&config_path, RepoConfig::default_toml())
                .map_err(|e| StoreError::io(&config_path, e))?;
            info!(root = %root.display(), "initialized repository");
        }
        Ok(outcome)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &ControlStore {
        &self.store
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn control_dir(&self) -> &Path {
        self.store.dir()
    }

    /// Take the exclusive repository lock for a mutating operation.
    pub fn lock(&self) -> Result<RepoLock, StoreError> {
        RepoLock::acquire(self.store.dir(), self.config.core.lock_timeout())
    }

    /// Top-level entries that a commit captures: everything at the root
    /// except the control directory and a root-level merge marker.
    pub fn workspace_entries(&self) -> Result<Vec<OsString>, StoreError> {
        Ok(fsutil::list_entries(&self.root)?
            .into_iter()
            .filter(|name| !store::is_control_entry(name))
            .collect())
    }

    /// Every top-level entry except the control directory.
    pub fn root_entries_except_control(&self) -> Result<Vec<OsString>, StoreError> {
        Ok(fsutil::list_entries(&self.root)?
            .into_iter()
            .filter(|name| name.as_os_str() != CONTROL_DIR)
            .collect())
    }
}
