//! Temporary path derivation
//!
//! The temporary file is always a sibling of the target: same directory,
//! same file name with a suffix appended. Keeping it in the same directory
//! keeps it on the same filesystem, which is what makes the final rename
//! atomic.
//!
//! ```text
//! data/
//! ├── db.json        # durable, only ever replaced by rename
//! └── db.json.temp   # private, exists only while a commit is running
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Derive the temporary path for `target` by appending `suffix`
///
/// Unlike `Path::with_extension`, this never replaces an existing extension:
/// `db.json` becomes `db.json.temp`, not `db.temp`.
pub fn temp_path_for(target: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = target.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Directory whose entry is replaced by the rename
///
/// A bare file name lives in the current directory.
pub fn parent_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
