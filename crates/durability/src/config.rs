//! Commit configuration
//!
//! The core only needs a target path. Everything here is layered on top:
//! how the temporary sibling is named and how hard the local filesystem
//! backend works to make a rename survive power loss.

/// Default suffix appended to the target path for the temporary file
pub const DEFAULT_TEMP_SUFFIX: &str = ".temp";

/// How much fsync work a local commit performs
///
/// | Mode | Temp file fsync | Directory fsync | Survives power loss |
/// |------|-----------------|-----------------|---------------------|
/// | None | No | No | Process crash only |
/// | Data | Yes | No | Contents, rename may roll back |
/// | Full | Yes | Yes | Contents and rename |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Write and rename only
    ///
    /// The target is still never half-written from the point of view of
    /// other processes, but the OS may lose the commit on power failure.
    None,

    /// fsync the temporary file before renaming it
    Data,

    /// fsync the temporary file, rename, then fsync the parent directory
    #[default]
    Full,
}

impl SyncMode {
    /// Whether the temporary file is fsynced before rename
    pub fn syncs_file(&self) -> bool {
        !matches!(self, SyncMode::None)
    }

    /// Whether the parent directory is fsynced after rename
    pub fn syncs_directory(&self) -> bool {
        matches!(self, SyncMode::Full)
    }
}

/// Commit serializer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitConfig {
    /// Suffix appended to the target path to form the temporary path
    pub temp_suffix: String,
    /// fsync policy for the local filesystem backend
    pub sync: SyncMode,
}

impl Default for CommitConfig {
    fn default() -> Self {
        CommitConfig {
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
            sync: SyncMode::Full,
        }
    }
}

impl CommitConfig {
    /// Create config without any fsync
    ///
    /// Suitable for tests and for caches that can be rebuilt.
    pub fn fast() -> Self {
        CommitConfig {
            sync: SyncMode::None,
            ..Default::default()
        }
    }

    /// Set the temporary file suffix
    pub fn with_temp_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.temp_suffix = suffix.into();
        self
    }

    /// Set the fsync policy
    pub fn with_sync(mut self, sync: SyncMode) -> Self {
        self.sync = sync;
        self
    }

    /// Validate configuration
    ///
    /// The suffix must be non-empty (otherwise the temp file *is* the target)
    /// and must not contain a path separator (otherwise the temp file could
    /// land on another filesystem, where rename is not atomic).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temp_suffix.is_empty() {
            return Err(ConfigError::InvalidTempSuffix(
                "suffix must not be empty".to_string(),
            ));
        }
        if self.temp_suffix.contains('/') || self.temp_suffix.contains(std::path::MAIN_SEPARATOR)
        {
            return Err(ConfigError::InvalidTempSuffix(format!(
                "suffix {:?} must not contain a path separator",
                self.temp_suffix
            )));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Temporary suffix cannot produce a sibling of the target
    #[error("Invalid temp suffix: {0}")]
    InvalidTempSuffix(String),

    /// Target path is unusable
    #[error("Invalid target path: {0}")]
    InvalidPath(String),
}
