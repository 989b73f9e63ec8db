//! Error types for snapshot commits
//!
//! A durable commit can fail in exactly the places the filesystem can:
//! writing the temporary file, renaming it over the target, or syncing the
//! parent directory afterwards. Each variant carries the path involved and
//! the underlying I/O error as its source.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for commit operations
pub type CommitResult<T> = std::result::Result<T, CommitError>;

/// Failure of a durable commit
#[derive(Debug, Error)]
pub enum CommitError {
    /// The temporary file could not be created, written, or synced
    #[error("failed to write temporary file {}: {source}", .path.display())]
    WriteTemp {
        /// Temporary path that was being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The temporary file could not be renamed onto the target
    #[error("failed to rename {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        /// Temporary path
        from: PathBuf,
        /// Target path
        to: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The rename happened but the containing directory could not be synced
    #[error("failed to sync directory {}: {source}", .path.display())]
    SyncDirectory {
        /// Directory that was being synced
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl CommitError {
    /// Path the failing storage operation was acting on
    ///
    /// For a rename this is the destination.
    pub fn path(&self) -> &Path {
        match self {
            CommitError::WriteTemp { path, .. } => path,
            CommitError::Rename { to, .. } => to,
            CommitError::SyncDirectory { path, .. } => path,
        }
    }

    /// The underlying I/O error kind
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            CommitError::WriteTemp { source, .. }
            | CommitError::Rename { source, .. }
            | CommitError::SyncDirectory { source, .. } => source.kind(),
        }
    }

    /// True if the target file was left untouched because the temp write failed
    pub fn is_write_temp(&self) -> bool {
        matches!(self, CommitError::WriteTemp { .. })
    }

    /// True if the failure happened while replacing the target
    pub fn is_rename(&self) -> bool {
        matches!(self, CommitError::Rename { .. })
    }
}
