//! Write-temp-then-rename primitive.
//!
//! After [`atomic_write`] returns `Ok(())`, `path` contains exactly the
//! bytes passed in; on any error `path` is left untouched and no temp file
//! survives. The temp file always lives in the same directory as `path` so
//! the final rename is a same-filesystem rename, which is atomic on every
//! platform this crate targets.

use std::io::Write;
use std::path::Path;

use crate::error::{CoreError, CoreResult};

pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> CoreResult<()> {
    let path = path.as_ref();
    let dir = path.parent().ok_or_else(|| {
        CoreError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent directory"),
        )
    })?;
    std::fs::create_dir_all(dir).map_err(|e| CoreError::io(dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".fastanime-tmp-")
        .tempfile_in(dir)
        .map_err(|e| CoreError::io(dir, e))?;

    tmp.write_all(bytes).map_err(|e| CoreError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| CoreError::io(path, e))?;

    tmp.persist(path)
        .map_err(|e| CoreError::io(path, e.error))?;

    Ok(())
}

/// Convenience wrapper for JSON-serializable values.
pub fn atomic_write_json<T: serde::Serialize>(path: impl AsRef<Path>, value: &T) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_full_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.json");
        atomic_write(&path, b"hello").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn overwrite_is_atomic_and_leaves_no_temp_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".fastanime-tmp-"))
            .collect();
        assert!(leftovers.is_empty(), "temp file leaked: {leftovers:?}");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/file.json");
        atomic_write(&path, b"x").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"x");
    }
}
