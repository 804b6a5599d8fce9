//! giestro core library.
//!
//! This crate provides the building blocks of a small local version-control
//! tool: the on-disk control store, whole-tree snapshots (commit and
//! rollback), branch merging with operator-resolved conflicts, and
//! reintegration of a freshly cloned external repository.

pub mod config;
pub mod errors;
pub mod fetch;
pub mod fsutil;
pub mod lock;
pub mod merge;
pub mod models;
pub mod operator;
pub mod repo;
pub mod snapshot;
pub mod store;

// Re-exports for convenience.
pub use config::RepoConfig;
pub use errors::CoreError;
pub use fetch::{Cloner, GitCloner, ReintegrationEngine};
pub use merge::MergeEngine;
pub use operator::{Decision, Operator};
pub use repo::Repository;
pub use snapshot::SnapshotEngine;
pub use store::ControlStore;
