//! Whole-file atomic replacement
//!
//! Every durable file is written to a sibling `.tmp` file, flushed to disk,
//! then renamed over the target. Readers see either the old or the new
//! content, never a torn write.

use crate::journal::error::{PersistError, PersistResult};
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sibling path used while a replacement is in flight
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("state"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> PersistResult<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(PersistError::io(dir))?;
    }
    Ok(())
}

/// Atomically replaces `path` with `bytes`
pub fn write_atomic(path: &Path, bytes: &[u8]) -> PersistResult<()> {
    ensure_parent(path)?;
    let tmp = temp_path(path);

    {
        let mut file = File::create(&tmp).map_err(PersistError::io(&tmp))?;
        file.write_all(bytes).map_err(PersistError::io(&tmp))?;
        file.sync_all().map_err(PersistError::io(&tmp))?;
    }

    fs::rename(&tmp, path).map_err(PersistError::io(path))?;
    Ok(())
}

/// Async flavour of [`write_atomic`] for callers on the runtime
pub async fn write_atomic_async(path: &Path, bytes: &[u8]) -> PersistResult<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(PersistError::io(dir))?;
    }
    let tmp = temp_path(path);

    {
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(PersistError::io(&tmp))?;
        file.write_all(bytes).await.map_err(PersistError::io(&tmp))?;
        file.sync_all().await.map_err(PersistError::io(&tmp))?;
    }

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(PersistError::io(path))?;
    Ok(())
}

/// Serializes `value` as pretty JSON and atomically replaces `path`
pub fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    what: &'static str,
) -> PersistResult<()> {
    let bytes =
        serde_json::to_vec_pretty(value).map_err(|source| PersistError::Serialize { what, source })?;
    write_atomic(path, &bytes)
}

/// Reads a JSON file, returning `None` when it does not exist
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> PersistResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PersistError::io(path)(e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| PersistError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_path_is_sibling() {
        let tmp = temp_path(Path::new("/data/out/state.json"));
        assert_eq!(tmp, PathBuf::from("/data/out/state.json.tmp"));
    }

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_write_atomic_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/file.json");

        write_atomic(&path, b"{}").unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_write_atomic_async() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.pdf");

        write_atomic_async(&path, b"%PDF-1.7").await.unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.7");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_read_json_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let value: Option<Vec<u32>> = read_json(&dir.path().join("absent.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_read_json_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "[{\"index\": 1,").unwrap();

        let result: PersistResult<Option<Vec<u32>>> = read_json(&path);
        assert!(matches!(result, Err(PersistError::Corrupt { .. })));
    }

    #[test]
    fn test_write_json_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("values.json");

        write_json_atomic(&path, &vec![1u32, 2, 3], "values").unwrap();
        let back: Option<Vec<u32>> = read_json(&path).unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
    }
}
