//! TOML-based repository configuration.
//!
//! The file lives at `.giest/config.toml` and is optional: a repository
//! without one behaves exactly as if every section held its defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

/// File name of the configuration inside the control directory.
pub const CONFIG_FILE: &str = "config.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Per-repository configuration loaded from `.giest/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoConfig {
    /// General settings.
    #[serde(default)]
    pub core: CoreConfig,

    /// Settings for `giestro fetch`.
    #[serde(default)]
    pub fetch: FetchConfig,
}

// ---------------------------------------------------------------------------
// Core
// ---------------------------------------------------------------------------

/// General repository settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Default tracing filter when `GIESTRO_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Milliseconds to wait for the repository lock before giving up.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_log_level() -> String {
    "warn".into()
}

fn default_lock_timeout_ms() -> u64 {
    2000
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl CoreConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Remote settings used to expand `owner/repo` shorthands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Forge API base URL (default `https://api.github.com`).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Explicit clone base URL. When set, this overrides the derivation
    /// from `api_url`.
    #[serde(default)]
    pub git_base_url: Option<String>,

    /// Prefixes that mark an argument as an `owner/repo` shorthand.
    #[serde(default = "default_shorthands")]
    pub shorthands: Vec<String>,
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}

fn default_shorthands() -> Vec<String> {
    vec!["gh:".into(), "github:".into()]
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            git_base_url: None,
            shorthands: default_shorthands(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl RepoConfig {
    /// Load the configuration from `path`, returning defaults when the file
    /// does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }

        info!(path = %path.display(), "loading configuration");
        let contents = std::fs::read_to_string(path)?;
        let config: RepoConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.core.lock_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "core.lock_timeout_ms".into(),
                detail: "lock timeout must be > 0".into(),
            });
        }
        if self.fetch.shorthands.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "fetch.shorthands".into(),
                detail: "shorthand prefixes must not be empty".into(),
            });
        }
        if self.fetch.api_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "fetch.api_url".into(),
                detail: "API URL must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Commented configuration written by `giestro init`.
    pub fn default_toml() -> &'static str {
        r#"# giestro repository configuration

[core]
# Tracing filter used when GIESTRO_LOG is not set.
log_level = "warn"
# How long to wait for another giestro process to release the repository.
lock_timeout_ms = 2000

[fetch]
# `giestro fetch gh:owner/repo` clones from the host derived from this URL.
api_url = "https://api.github.com"
# git_base_url = "https://github.company.com"
shorthands = ["gh:", "github:"]
"#
    }
}
