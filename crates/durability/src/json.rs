//! JSON snapshot writer
//!
//! Encodes a caller's state with `serde_json` and hands the bytes to a
//! [`CommitSerializer`]. Encoding happens on the calling thread before the
//! serializer sees the payload, so a value that fails to encode never
//! disturbs a running commit chain.

use std::marker::PhantomData;
use std::path::Path;

use serde::Serialize;
use snapcommit_core::{CommitError, CommitStorage, Payload};

use crate::local_fs::LocalFs;
use crate::serializer::CommitSerializer;

/// Errors from saving a JSON snapshot
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The value could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The encoded snapshot could not be committed
    #[error("Commit error: {0}")]
    Commit(#[from] CommitError),
}

/// Saves full snapshots of `T` as JSON through a commit serializer
pub struct JsonSnapshotWriter<T, S: CommitStorage = LocalFs> {
    serializer: CommitSerializer<S>,
    pretty: bool,
    _value: PhantomData<fn(&T)>,
}

impl<T: Serialize> JsonSnapshotWriter<T, LocalFs> {
    /// Create a writer for `path` using the default serializer configuration
    ///
    /// `pretty` selects indented, human-readable output.
    pub fn new(path: impl AsRef<Path>, pretty: bool) -> Self {
        Self::from_serializer(CommitSerializer::new(path), pretty)
    }
}

impl<T: Serialize, S: CommitStorage> JsonSnapshotWriter<T, S> {
    /// Wrap an existing serializer
    pub fn from_serializer(serializer: CommitSerializer<S>, pretty: bool) -> Self {
        JsonSnapshotWriter {
            serializer,
            pretty,
            _value: PhantomData,
        }
    }

    /// Encode `value` and commit it
    ///
    /// Same coalescing semantics as [`CommitSerializer::write`].
    pub fn save(&self, value: &T) -> Result<(), SnapshotError> {
        let payload = self.encode(value)?;
        self.serializer.write(payload)?;
        Ok(())
    }

    /// Encode `value` without committing it
    pub fn encode(&self, value: &T) -> Result<Payload, serde_json::Error> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(Payload::new(bytes))
    }

    /// Whether output is indented
    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    /// The underlying serializer
    pub fn serializer(&self) -> &CommitSerializer<S> {
        &self.serializer
    }
}
