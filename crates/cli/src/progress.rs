//! Spinner shown while the clone client runs.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use giestro_core::errors::CloneError;
use giestro_core::Cloner;

/// Wraps a [`Cloner`] with a terminal spinner.
pub struct SpinnerCloner<C> {
    inner: C,
}

impl<C: Cloner> SpinnerCloner<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: Cloner> Cloner for SpinnerCloner<C> {
    fn clone_into(&self, url: &str, dest: &Path) -> Result<String, CloneError> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.blue} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.set_message(format!("Cloning {}...", url));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = self.inner.clone_into(url, dest);

        spinner.finish_and_clear();
        result
    }
}
