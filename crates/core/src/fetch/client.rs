//! Clone clients used by `fetch`.

use std::path::Path;

use tracing::{info, instrument, warn};

use crate::errors::CloneError;

/// Something that can clone a repository URL into an empty directory.
pub trait Cloner {
    /// Clone `url` into `dest`, which exists and is empty. Returns text to
    /// show the operator.
    fn clone_into(&self, url: &str, dest: &Path) -> Result<String, CloneError>;
}

/// Clones with libgit2.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCloner;

impl Cloner for GitCloner {
    #[instrument(skip(self), fields(dest = %dest.display()))]
    fn clone_into(&self, url: &str, dest: &Path) -> Result<String, CloneError> {
        info!("cloning git repository");
        let repo = git2::build::RepoBuilder::new()
            .clone(url, dest)
            .map_err(|e| {
                warn!(error = %e, "clone failed");
                CloneError {
                    output: e.message().to_string(),
                }
            })?;

        let head = match repo.head().and_then(|h| h.peel_to_commit()) {
            Ok(commit) => {
                let sha = commit.id().to_string();
                format!(
                    "HEAD is now at {} {}",
                    &sha[..7.min(sha.len())],
                    commit.summary().unwrap_or("")
                )
            }
            Err(_) => "cloned an empty repository".to_string(),
        };
        info!("clone completed");
        Ok(format!("Cloned {} into {}\n{}", url, dest.display(), head))
    }
}
