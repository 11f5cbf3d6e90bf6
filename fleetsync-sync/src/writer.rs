//! Atomic file writer for template output.
//!
//! ## `atomic_write` protocol
//!
//! 1. Compare the new contents with what is already on disk → skip if identical.
//! 2. Create parent directories.
//! 3. Write to `<path>.fleetsync.tmp`.
//! 4. Rename to the final path (atomic on POSIX); remove the tmp file on failure.

use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

/// Outcome of an individual file write inside a repository working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File already held exactly these bytes.
    Unchanged { path: PathBuf },
    /// File no longer exists in the template and was deleted.
    Removed { path: PathBuf },
}

impl WriteResult {
    pub fn is_change(&self) -> bool {
        !matches!(self, WriteResult::Unchanged { .. })
    }
}

/// Atomically write `contents` to `path` unless it already holds them.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<WriteResult, SyncError> {
    let tmp = PathBuf::from(format!("{}.fleetsync.tmp", path.display()));
    atomic_write_with_tmp(path, contents, &tmp)
}

fn atomic_write_with_tmp(path: &Path, contents: &[u8], tmp: &Path) -> Result<WriteResult, SyncError> {
    match std::fs::read(path) {
        Ok(existing) if existing == contents => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(path, e)),
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent() {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    std::fs::write(tmp, contents).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn first_write_returns_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("README.md");
        let result = atomic_write(&path, b"hello").unwrap();
        assert!(matches!(result, WriteResult::Written { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn same_content_returns_unchanged() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.md");
        atomic_write(&path, b"same content").unwrap();
        let result = atomic_write(&path, b"same content").unwrap();
        assert!(matches!(result, WriteResult::Unchanged { .. }));
        assert!(!result.is_change());
    }

    #[test]
    fn changed_content_returns_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.md");
        atomic_write(&path, b"v1").unwrap();
        let result = atomic_write(&path, b"v2").unwrap();
        assert!(matches!(result, WriteResult::Written { .. }));
    }

    #[test]
    fn tmp_file_removed_after_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.md");
        atomic_write(&path, b"data").unwrap();
        let tmp_path = PathBuf::from(format!("{}.fleetsync.tmp", path.display()));
        assert!(!tmp_path.exists(), ".fleetsync.tmp must be cleaned up");
    }

    #[test]
    fn creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".github").join("workflows").join("ci.yml");
        atomic_write(&path, b"on: push").unwrap();
        assert!(path.exists());
    }

    #[test]
    #[cfg(unix)]
    fn rename_failure_leaves_original_and_cleans_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();

        let path = readonly_dir.join("file.md");
        fs::write(&path, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        let tmp_dir = TempDir::new().unwrap();
        let tmp_path = tmp_dir.path().join("file.md.fleetsync.tmp");

        let result = atomic_write_with_tmp(&path, b"new content", &tmp_path);

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Running as root bypasses directory permissions; only assert when it failed.
        if result.is_err() {
            assert_eq!(fs::read_to_string(&path).unwrap(), "original");
            assert!(!tmp_path.exists(), ".fleetsync.tmp should be cleaned up");
        }
    }
}
