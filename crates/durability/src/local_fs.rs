//! Local filesystem commit storage
//!
//! Uses the write-fsync-rename pattern:
//! 1. Create or truncate the temporary file and write the payload
//! 2. fsync the temporary file (`SyncMode::Data` and `Full`)
//! 3. Atomic rename onto the target
//! 4. fsync the parent directory (`SyncMode::Full`)
//!
//! Either the complete new snapshot is at the target path or the complete
//! previous one is. There is no window in which a partial file is visible.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use snapcommit_core::CommitStorage;

use crate::config::SyncMode;
use crate::paths::parent_dir;

/// Commit storage backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs {
    sync: SyncMode,
}

impl LocalFs {
    /// Create a backend with the given fsync policy
    pub fn new(sync: SyncMode) -> Self {
        LocalFs { sync }
    }

    /// The fsync policy in effect
    pub fn sync_mode(&self) -> SyncMode {
        self.sync
    }
}

impl CommitStorage for LocalFs {
    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let dir = parent_dir(path);
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }

        let mut file = File::create(path)?;
        file.write_all(bytes)?;

        if self.sync.syncs_file() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn replace(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    // Directories cannot be opened for syncing on Windows.
    fn sync_directory(&self, target: &Path) -> io::Result<()> {
        if !self.sync.syncs_directory() {
            return Ok(());
        }
        #[cfg(unix)]
        {
            let dir = File::open(parent_dir(target))?;
            dir.sync_all()?;
        }
        #[cfg(not(unix))]
        {
            let _ = target;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_replace() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalFs::new(SyncMode::Full);
        let temp = temp_dir.path().join("db.json.temp");
        let target = temp_dir.path().join("db.json");

        storage.write_file(&temp, b"{\"v\":1}").unwrap();
        storage.replace(&temp, &target).unwrap();
        storage.sync_directory(&target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"{\"v\":1}");
        assert!(!temp.exists());
    }

    #[test]
    fn test_write_truncates_existing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalFs::default();
        let path = temp_dir.path().join("db.json.temp");

        fs::write(&path, b"a much longer leftover from a crashed commit").unwrap();
        storage.write_file(&path, b"short").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"short");
    }

    #[test]
    fn test_replace_overwrites_target() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalFs::new(SyncMode::None);
        let temp = temp_dir.path().join("db.temp");
        let target = temp_dir.path().join("db");

        fs::write(&target, b"old").unwrap();
        storage.write_file(&temp, b"new").unwrap();
        storage.replace(&temp, &target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn test_write_creates_missing_parent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalFs::new(SyncMode::Data);
        let path = temp_dir.path().join("nested").join("dir").join("db.temp");

        storage.write_file(&path, b"x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_replace_missing_source_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalFs::default();

        let err = storage
            .replace(&temp_dir.path().join("absent.temp"), &temp_dir.path().join("db"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
