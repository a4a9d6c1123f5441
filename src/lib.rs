//! Repliq: keep live replicas of SQLite databases.
//!
//! Watches a directory of primary databases, computes a schema-aware SQL diff
//! against the backup copy of each changed file, appends the diff to an
//! append-only per-database journal, and replays it onto the backup.

pub mod delta;
pub mod diff;
pub mod engine;
pub mod patch;
pub mod types;
pub mod utils;
pub mod watcher;

/// Re-export types for API
pub use types::*;

/// Result alias used by the public repliq API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
