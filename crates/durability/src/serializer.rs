//! Commit serializer
//!
//! Serializes and coalesces full-snapshot writes to a single target file.
//!
//! ## State machine
//!
//! ```text
//!            write(p)                       write(q)
//!   Idle ─────────────────▶ Committing ◀───────────── (q replaces pending)
//!    ▲                          │
//!    │   done, slot empty       │  done, slot has q
//!    └──────────────────────────┤────────────────▶ commit q
//! ```
//!
//! ## Guarantees
//!
//! - At most one durable commit (temp write + rename) runs at a time
//! - At most one payload waits; a newer write replaces it, so superseded
//!   payloads never reach disk
//! - The call that finds the serializer idle commits inline, then drains the
//!   pending slot in a loop before returning
//! - After every failure the serializer is idle again
//!
//! The commit flag and the pending slot share one lock, so check-and-set of
//! the flag and replace/take of the slot are each a single step. The lock is
//! never held across storage I/O.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use snapcommit_core::{CommitError, CommitResult, CommitStorage, Payload};
use tracing::{debug, trace, warn};

use crate::config::{CommitConfig, ConfigError};
use crate::local_fs::LocalFs;
use crate::paths::{parent_dir, temp_path_for};

const LOG_TARGET: &str = "snapcommit::commit";

/// Commit flag plus pending slot
#[derive(Debug, Default)]
struct CommitState {
    /// True while a commit chain is running
    committing: bool,
    /// Latest payload requested while committing
    pending: Option<Payload>,
}

/// Serialized, coalescing, atomic writer for one target file
///
/// One instance per target path. Two serializers pointed at the same path
/// race on the shared temporary file and are not supported.
pub struct CommitSerializer<S: CommitStorage = LocalFs> {
    path: PathBuf,
    temp_path: PathBuf,
    storage: S,
    state: Mutex<CommitState>,
}

impl CommitSerializer<LocalFs> {
    /// Create a serializer for `path` with the default configuration
    ///
    /// Commits go through the local filesystem with full fsync and use
    /// `<path>.temp` as the temporary file. Nothing touches disk until the
    /// first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let config = CommitConfig::default();
        let path = path.as_ref().to_path_buf();
        let temp_path = temp_path_for(&path, &config.temp_suffix);
        CommitSerializer {
            path,
            temp_path,
            storage: LocalFs::new(config.sync),
            state: Mutex::new(CommitState::default()),
        }
    }

    /// Create a serializer on the local filesystem with explicit configuration
    pub fn with_config(path: impl AsRef<Path>, config: CommitConfig) -> Result<Self, ConfigError> {
        let storage = LocalFs::new(config.sync);
        Self::with_storage(path, config, storage)
    }
}

impl<S: CommitStorage> CommitSerializer<S> {
    /// Create a serializer over an arbitrary storage backend
    ///
    /// `config.sync` is only meaningful to [`LocalFs`]; other backends
    /// decide durability themselves.
    pub fn with_storage(
        path: impl AsRef<Path>,
        config: CommitConfig,
        storage: S,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let path = path.as_ref().to_path_buf();
        if path.file_name().is_none() {
            return Err(ConfigError::InvalidPath(format!(
                "{} does not name a file",
                path.display()
            )));
        }

        let temp_path = temp_path_for(&path, &config.temp_suffix);
        Ok(CommitSerializer {
            path,
            temp_path,
            storage,
            state: Mutex::new(CommitState::default()),
        })
    }

    /// Target file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Private temporary path used during commits
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Request that `payload` becomes the durable contents of the target
    ///
    /// If a commit is already running, `payload` replaces whatever is pending
    /// and this returns `Ok(())` at once; the running chain commits it later.
    /// Otherwise this call commits `payload` and then every payload that
    /// arrives meanwhile, returning once the pending slot is empty.
    ///
    /// # Errors
    ///
    /// Returns the first commit failure of the chain this call drives. With
    /// coalescing, that failure may belong to a payload supplied by a
    /// different caller. After a failure the serializer is idle, the
    /// temporary file has been removed, and any pending payload is dropped;
    /// callers recover by writing their current state again.
    pub fn write(&self, payload: impl Into<Payload>) -> CommitResult<()> {
        let payload = payload.into();

        {
            let mut state = self.state.lock();
            if state.committing {
                trace!(
                    target: LOG_TARGET,
                    bytes = payload.len(),
                    replaced = state.pending.is_some(),
                    "Commit in progress, payload queued"
                );
                state.pending = Some(payload);
                return Ok(());
            }
            state.committing = true;
        }

        let mut guard = ChainGuard {
            state: &self.state,
            path: &self.path,
            armed: true,
        };

        let mut next = payload;
        loop {
            self.commit(&next)?;

            let mut state = self.state.lock();
            match state.pending.take() {
                Some(queued) => {
                    debug!(
                        target: LOG_TARGET,
                        path = %self.path.display(),
                        bytes = queued.len(),
                        "Draining coalesced payload"
                    );
                    next = queued;
                }
                None => {
                    state.committing = false;
                    guard.armed = false;
                    return Ok(());
                }
            }
        }
    }

    /// Remove a temporary file left behind by a crash
    ///
    /// Returns `Ok(true)` if a file was removed. Does nothing while a commit
    /// is running, since the temporary file then belongs to that commit.
    pub fn remove_stale_temp(&self) -> io::Result<bool> {
        let state = self.state.lock();
        if state.committing {
            return Ok(false);
        }

        match self.storage.remove_file(&self.temp_path) {
            Ok(()) => {
                debug!(
                    target: LOG_TARGET,
                    path = %self.temp_path.display(),
                    "Removed stale temporary file"
                );
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// One durable commit: temp write, rename, directory sync
    fn commit(&self, payload: &Payload) -> CommitResult<()> {
        debug!(
            target: LOG_TARGET,
            path = %self.path.display(),
            bytes = payload.len(),
            "Commit started"
        );

        if let Err(source) = self.storage.write_file(&self.temp_path, payload.as_bytes()) {
            self.discard_temp();
            return Err(CommitError::WriteTemp {
                path: self.temp_path.clone(),
                source,
            });
        }

        if let Err(source) = self.storage.replace(&self.temp_path, &self.path) {
            self.discard_temp();
            return Err(CommitError::Rename {
                from: self.temp_path.clone(),
                to: self.path.clone(),
                source,
            });
        }

        self.storage
            .sync_directory(&self.path)
            .map_err(|source| CommitError::SyncDirectory {
                path: parent_dir(&self.path).to_path_buf(),
                source,
            })?;

        debug!(
            target: LOG_TARGET,
            path = %self.path.display(),
            bytes = payload.len(),
            "Commit finished"
        );
        Ok(())
    }

    fn discard_temp(&self) {
        match self.storage.remove_file(&self.temp_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(
                    target: LOG_TARGET,
                    path = %self.temp_path.display(),
                    error = %e,
                    "Failed to remove temporary file"
                );
            }
        }
    }
}

impl<S: CommitStorage> fmt::Debug for CommitSerializer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CommitSerializer")
            .field("path", &self.path)
            .field("temp_path", &self.temp_path)
            .field("committing", &state.committing)
            .field("pending", &state.pending)
            .finish()
    }
}

/// Returns the serializer to idle when a commit chain unwinds
///
/// Armed for the whole chain and disarmed only on the successful exit, so a
/// failed commit (or a panicking storage backend) can never leave the flag
/// set. A pending payload is dropped with it: the caller that sees the
/// error rewrites current state, and keeping an older payload around could
/// commit it after a newer one.
struct ChainGuard<'a> {
    state: &'a Mutex<CommitState>,
    path: &'a Path,
    armed: bool,
}

impl Drop for ChainGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut state = self.state.lock();
        state.committing = false;
        if let Some(dropped) = state.pending.take() {
            warn!(
                target: LOG_TARGET,
                path = %self.path.display(),
                bytes = dropped.len(),
                "Commit failed, discarding pending payload"
            );
        }
    }
}
