//! Durability layer for SnapCommit
//!
//! This crate handles everything that touches disk:
//!
//! - Commit serializer: at most one atomic commit in flight, one pending
//!   payload, latest write wins
//! - Commit configuration: temp suffix and fsync policy
//! - Local filesystem storage with the write-fsync-rename pattern
//! - JSON snapshot writer layered on the serializer
//! - Instrumented storage for concurrency and fault-injection tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config; // Temp suffix, SyncMode, validation
pub mod json; // serde_json encoding on top of the serializer
pub mod local_fs; // std::fs backed CommitStorage
pub mod paths; // Temporary path derivation
pub mod serializer; // Commit flag, pending slot, drain loop
pub mod testing; // Instrumented storage

// === Re-exports ===
pub use config::{CommitConfig, ConfigError, SyncMode, DEFAULT_TEMP_SUFFIX};
pub use json::{JsonSnapshotWriter, SnapshotError};
pub use local_fs::LocalFs;
pub use paths::temp_path_for;
pub use serializer::CommitSerializer;

pub use snapcommit_core::{CommitError, CommitResult, CommitStorage, Payload};
