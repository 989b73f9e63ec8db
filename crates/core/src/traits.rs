//! Storage abstraction consumed by the commit serializer
//!
//! A commit needs exactly two capabilities from the layer underneath it:
//! write a whole file, and atomically replace one path with another. Anything
//! that can provide both (the local filesystem, an instrumented test double,
//! a FUSE mount) can sit behind a serializer.

use std::io;
use std::path::Path;
use std::sync::Arc;

/// Storage primitives required for an atomic commit
///
/// Thread safety: a serializer may be driven from several threads, so
/// implementations must be `Send + Sync`. The serializer guarantees it never
/// calls these methods concurrently for the same target.
pub trait CommitStorage: Send + Sync {
    /// Create or truncate `path` and write `bytes` to it in full
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be created, written or
    /// (depending on the implementation) synced.
    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Atomically replace `to` with `from`
    ///
    /// Readers of `to` must observe either its old contents or the contents
    /// of `from`, never a mix.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the replacement cannot be performed.
    fn replace(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Make a completed replacement of `target` durable
    ///
    /// Called after a successful [`replace`](Self::replace). Backends whose
    /// renames are durable on return can keep the default no-op.
    fn sync_directory(&self, _target: &Path) -> io::Result<()> {
        Ok(())
    }

    /// Remove a leftover temporary file
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

impl<S: CommitStorage + ?Sized> CommitStorage for Arc<S> {
    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        (**self).write_file(path, bytes)
    }

    fn replace(&self, from: &Path, to: &Path) -> io::Result<()> {
        (**self).replace(from, to)
    }

    fn sync_directory(&self, target: &Path) -> io::Result<()> {
        (**self).sync_directory(target)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        (**self).remove_file(path)
    }
}
