//! Crash-safe persistence primitives.
//!
//! Every document written by the engine goes through the same discipline:
//! serialize, write to a sibling `.tmp` file, fsync, then atomically rename
//! over the destination. A crash mid-write leaves the previous committed
//! file untouched; leftover `.tmp` files are swept on recovery.
//!
//! Reads are fail-soft: a missing or undecodable document is treated as
//! absent, never as a fatal condition. Only write failures surface as
//! [`StorageError`], since a lost write breaks the crash-safety invariant.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Errors from persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write a JSON document via temp-then-atomic-rename.
pub(crate) async fn write_json_atomic<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let content = serde_json::to_string_pretty(value)?;
    let tmp = tmp_path(path);

    let mut file = fs::File::create(&tmp).await?;
    file.write_all(content.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read a JSON document, treating a missing or undecodable file as absent.
pub(crate) async fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "document absent");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping undecodable document");
            None
        }
    }
}

/// Delete any leftover `.tmp` files from an interrupted write in `dir`.
pub(crate) async fn sweep_tmp_files(dir: &Path) -> Result<(), StorageError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return Ok(()), // directory absent: nothing to sweep
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|e| e == "tmp").unwrap_or(false) {
            warn!(path = %path.display(), "removing leftover temp file");
            let _ = fs::remove_file(&path).await;
        }
    }
    Ok(())
}

/// Sibling temp path for an atomic write: `foo.json` -> `foo.json.tmp`.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Current timestamp as unix seconds.
pub(crate) fn timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", now.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        let doc = Doc {
            name: "vault".to_string(),
            count: 3,
        };
        write_json_atomic(&path, &doc).await.unwrap();

        let loaded: Option<Doc> = read_json_opt(&path).await;
        assert_eq!(loaded, Some(doc));

        // No temp file left behind.
        assert!(!tmp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_read_missing_is_absent() {
        let dir = TempDir::new().unwrap();
        let loaded: Option<Doc> = read_json_opt(&dir.path().join("nope.json")).await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_read_corrupt_is_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").await.unwrap();

        let loaded: Option<Doc> = read_json_opt(&path).await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_tmp_files() {
        let dir = TempDir::new().unwrap();
        let keep = dir.path().join("doc.json");
        let stray = dir.path().join("doc.json.tmp");
        fs::write(&keep, "{}").await.unwrap();
        fs::write(&stray, "half-written").await.unwrap();

        sweep_tmp_files(dir.path()).await.unwrap();

        assert!(keep.exists());
        assert!(!stray.exists());
    }

    #[tokio::test]
    async fn test_sweep_missing_dir_is_noop() {
        let dir = TempDir::new().unwrap();
        sweep_tmp_files(&dir.path().join("absent")).await.unwrap();
    }
}
