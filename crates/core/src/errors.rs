//! Error types for the giestro core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// Whether this error means the control directory is missing.
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, CoreError::Store(StoreError::NotInitialized(_)))
    }
}

// ---------------------------------------------------------------------------
// Control store errors
// ---------------------------------------------------------------------------

/// Errors from the control store and snapshot operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The `.giest` control directory does not exist.
    #[error("not a giestro repository: {} (run 'giestro init')", .0.display())]
    NotInitialized(PathBuf),

    /// The named branch does not exist.
    #[error("branch '{0}' not found")]
    BranchNotFound(String),

    /// A branch with this name already exists.
    #[error("branch '{0}' already exists")]
    BranchAlreadyExists(String),

    /// The commit does not exist in the branch.
    #[error("commit '{commit}' not found in branch '{branch}'")]
    CommitNotFound { branch: String, commit: String },

    /// The computed commit id is already taken (numbering reuse after a deletion).
    #[error("commit '{commit}' already exists in branch '{branch}'; numbering collides after a deleted commit")]
    CommitCollision { branch: String, commit: String },

    /// A branch name or commit id is not a single plain path component.
    #[error("invalid name '{0}'")]
    InvalidName(String),

    /// A workspace entry uses a name the commit layout reserves for itself.
    #[error("workspace entry '{0}' uses a name reserved inside commits; rename it before committing")]
    ReservedName(String),

    /// Another giestro process holds the repository lock.
    #[error("repository is locked by another giestro process: {}", .0.display())]
    Locked(PathBuf),

    /// Filesystem failure on a specific path.
    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Wrap an `io::Error` with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Merge errors
// ---------------------------------------------------------------------------

/// Errors from the merge engine.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operator could not be asked for a decision.
    #[error("merge prompt failed: {0}")]
    Prompt(#[from] PromptError),
}

// ---------------------------------------------------------------------------
// Fetch errors
// ---------------------------------------------------------------------------

/// Errors from the external reintegration (fetch) engine.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The operator declined the confirmation.
    #[error("fetch aborted, nothing was changed")]
    Aborted,

    /// The clone step failed. The repository root is left as the clone left it
    /// and the pre-fetch snapshot is kept at `snapshot`.
    #[error("clone of '{url}' failed: {output} (previous state kept at '{}')", .snapshot.display())]
    CloneFailed {
        url: String,
        output: String,
        snapshot: PathBuf,
    },

    /// A filesystem step after the snapshot failed. The snapshot is kept.
    #[error("fetch failed while {step}: {source} (previous state kept at '{}')", .snapshot.display())]
    Degraded {
        step: &'static str,
        snapshot: PathBuf,
        #[source]
        source: StoreError,
    },

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operator could not be asked for confirmation.
    #[error("fetch prompt failed: {0}")]
    Prompt(#[from] PromptError),
}

impl FetchError {
    /// Location of the retained pre-fetch snapshot, if the failure left one.
    pub fn snapshot(&self) -> Option<&std::path::Path> {
        match self {
            FetchError::CloneFailed { snapshot, .. } | FetchError::Degraded { snapshot, .. } => {
                Some(snapshot)
            }
            _ => None,
        }
    }
}

/// Failure reported by a [`Cloner`](crate::fetch::Cloner).
#[derive(Debug, Error)]
#[error("{output}")]
pub struct CloneError {
    /// Captured output of the clone client.
    pub output: String,
}

// ---------------------------------------------------------------------------
// Prompt errors
// ---------------------------------------------------------------------------

/// Errors raised while obtaining an answer from the operator.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Terminal I/O failed or was interrupted.
    #[error("prompt I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A scripted operator ran out of answers.
    #[error("no answer available for '{0}'")]
    NoAnswer(String),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = StoreError::BranchNotFound("dev".into());
        assert_eq!(err.to_string(), "branch 'dev' not found");

        let err = StoreError::CommitNotFound {
            branch: "main".into(),
            commit: "commit-9".into(),
        };
        assert_eq!(
            err.to_string(),
            "commit 'commit-9' not found in branch 'main'"
        );

        let err = FetchError::CloneFailed {
            url: "https://example.com/x.git".into(),
            output: "repository not found".into(),
            snapshot: PathBuf::from("/tmp/giestro-fetch-1"),
        };
        let msg = err.to_string();
        assert!(msg.contains("repository not found"));
        assert!(msg.contains("/tmp/giestro-fetch-1"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let core_err: CoreError = StoreError::NotInitialized(PathBuf::from("/repo")).into();
        assert!(core_err.is_not_initialized());

        let core_err: CoreError = FetchError::Aborted.into();
        assert!(matches!(core_err, CoreError::Fetch(_)));
        assert!(!core_err.is_not_initialized());
    }
}
