//! Pre-flight directory validation.
//!
//! A point-in-time check that a path names an existing, writable directory. Passing validation
//! does not guarantee later filesystem calls succeed; the engine handles those failures per file.

use crate::error::ValidationError;
use std::fs;
use std::path::{Path, PathBuf};

/// A directory that existed, was a directory, and looked writable when validated.
///
/// The wrapped path is absolute and canonical (symlinks and `..` resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPath(PathBuf);

impl ValidatedPath {
    /// Returns the validated absolute path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Consumes the wrapper and returns the path.
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ValidatedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Validates that `path` is an existing, writable directory.
///
/// # Errors
///
/// * [`ValidationError::NotADirectory`] if the path does not exist or is not a directory.
/// * [`ValidationError::NotWritable`] if the current process may not create entries in it.
///
/// Nothing is created on disk. A directory without any write bit is always rejected; on Unix the
/// effective user must also pass `access(W_OK | X_OK)`, which covers directories owned by
/// someone else.
///
/// # Examples
///
/// ```
/// use sorter::validate::validate;
///
/// let dir = std::env::temp_dir();
/// let validated = validate(&dir).unwrap();
/// assert!(validated.as_path().is_absolute());
/// ```
pub fn validate(path: &Path) -> Result<ValidatedPath, ValidationError> {
    let not_a_directory = || ValidationError::NotADirectory {
        path: path.to_path_buf(),
    };

    let canonical = fs::canonicalize(path).map_err(|_| not_a_directory())?;
    let metadata = fs::metadata(&canonical).map_err(|_| not_a_directory())?;
    if !metadata.is_dir() {
        return Err(not_a_directory());
    }

    if metadata.permissions().readonly() || !can_create_entries(&canonical) {
        return Err(ValidationError::NotWritable { path: canonical });
    }

    Ok(ValidatedPath(canonical))
}

#[cfg(unix)]
fn can_create_entries(dir: &Path) -> bool {
    use nix::unistd::{AccessFlags, access};

    access(dir, AccessFlags::W_OK | AccessFlags::X_OK).is_ok()
}

#[cfg(not(unix))]
fn can_create_entries(_dir: &Path) -> bool {
    true
}
