//! SnapCommit - crash-safe, coalescing snapshot commits
//!
//! SnapCommit persists successive full snapshots of a data store to one
//! file. Each commit writes a temporary sibling and renames it over the
//! target, so readers (including the process itself after a crash) only
//! ever see a complete snapshot. When writes arrive faster than the disk
//! can take them, at most one commit runs, at most one payload waits, and
//! only the latest payload is eventually written.
//!
//! # Quick Start
//!
//! ```no_run
//! use snapcommit::CommitSerializer;
//!
//! let writer = CommitSerializer::new("data/db.json");
//! writer.write(r#"{"users":[]}"#)?;
//! # Ok::<(), snapcommit::CommitError>(())
//! ```
//!
//! # Architecture
//!
//! - `snapcommit-core`: [`Payload`], [`CommitError`], [`CommitStorage`]
//! - `snapcommit-durability`: [`CommitSerializer`], configuration, local
//!   filesystem storage, JSON snapshot layer, test instrumentation

pub use snapcommit_core::{CommitError, CommitResult, CommitStorage, Payload};
pub use snapcommit_durability::{
    temp_path_for, CommitConfig, CommitSerializer, ConfigError, JsonSnapshotWriter, LocalFs,
    SnapshotError, SyncMode, DEFAULT_TEMP_SUFFIX,
};

/// Test instrumentation (gates, delays, fault injection)
pub mod testing {
    pub use snapcommit_durability::testing::*;
}
