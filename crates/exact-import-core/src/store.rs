//! Authenticated-session persistence.
//!
//! The session is an opaque blob produced by the browser layer. Stores only
//! load and save it; they never look inside.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Session store errors.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Session store IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load/save contract over a single opaque session blob.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The stored session, or `None` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<Vec<u8>>, SessionStoreError>;

    /// Replace any stored session with `blob`.
    async fn save(&self, blob: &[u8]) -> Result<(), SessionStoreError>;
}

/// In-memory session store for testing.
#[derive(Default)]
pub struct MemorySessionStore {
    blob: parking_lot::Mutex<Option<Vec<u8>>>,
    saves: parking_lot::Mutex<usize>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store.
    pub fn with_blob(blob: impl Into<Vec<u8>>) -> Self {
        Self {
            blob: parking_lot::Mutex::new(Some(blob.into())),
            saves: parking_lot::Mutex::new(0),
        }
    }

    /// Current contents.
    pub fn blob(&self) -> Option<Vec<u8>> {
        self.blob.lock().clone()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Vec<u8>>, SessionStoreError> {
        Ok(self.blob.lock().clone())
    }

    async fn save(&self, blob: &[u8]) -> Result<(), SessionStoreError> {
        *self.blob.lock() = Some(blob.to_vec());
        *self.saves.lock() += 1;
        Ok(())
    }
}

/// File backed store, one file per session (`<temp>/cache/session-data`).
///
/// Saves go through a sibling temporary file and a rename so a crash never
/// leaves a truncated session behind.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_err(&self, source: std::io::Error) -> SessionStoreError {
        SessionStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<Vec<u8>>, SessionStoreError> {
        match fs::read(&self.path).await {
            Ok(blob) => {
                debug!("Loaded session ({} bytes) from {:?}", blob.len(), self.path);
                Ok(Some(blob))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored session at {:?}", self.path);
                Ok(None)
            }
            Err(e) => Err(self.io_err(e)),
        }
    }

    async fn save(&self, blob: &[u8]) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| self.io_err(e))?;
        }

        let tmp = self.temp_path();
        fs::write(&tmp, blob).await.map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_err(e))?;

        debug!("Saved session ({} bytes) to {:?}", blob.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path().join("cache").join("session-data"));

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path().join("cache").join("session-data"));

        store.save(b"[{\"name\":\"ASP.NET_SessionId\"}]").await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.as_deref(), Some(&b"[{\"name\":\"ASP.NET_SessionId\"}]"[..]));
    }

    #[tokio::test]
    async fn test_file_store_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path().join("session-data"));

        store.save(b"first").await.unwrap();
        store.save(b"second").await.unwrap();

        assert_eq!(store.load().await.unwrap().as_deref(), Some(&b"second"[..]));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_file_store_unreadable_path_errors() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the file should be.
        let store = FileSessionStore::new(temp_dir.path());

        let result = store.load().await;
        assert!(matches!(result, Err(SessionStoreError::Io { .. })));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySessionStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(b"blob").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some(&b"blob"[..]));
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_temp_path() {
        let store = FileSessionStore::new("/tmp/x/cache/session-data");
        assert_eq!(store.temp_path(), PathBuf::from("/tmp/x/cache/session-data.tmp"));
    }
}
