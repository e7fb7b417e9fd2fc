//! Key-value store implementations.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, instrument};

use super::{KeyValueStore, PersistenceError};

/// In-process key-value store.
///
/// Cheaply cloneable; clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryKv {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKv {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// File-backed key-value store: one `<key>.json` file per key in a directory.
///
/// Writes go to a temporary file that is renamed into place, so a crash never
/// leaves a half-written value behind.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Create a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the value files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PersistenceError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKv {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, value), fields(dir = %self.dir.display(), bytes = value.len()))]
    async fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&tmp, value.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("value written");
        Ok(())
    }

    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{get_json, set_json};

    #[tokio::test]
    async fn test_memory_kv_roundtrip() {
        let kv = MemoryKv::new();
        assert!(kv.get("cart").await.unwrap().is_none());

        kv.set("cart", "[]".to_owned()).await.unwrap();
        assert_eq!(kv.get("cart").await.unwrap().as_deref(), Some("[]"));

        kv.remove("cart").await.unwrap();
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn test_memory_kv_clones_share_state() {
        let kv = MemoryKv::new();
        let other = kv.clone();
        kv.set("k", "v".to_owned()).await.unwrap();
        assert_eq!(other.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_file_kv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKv::new(dir.path().join("data"));

        assert!(kv.get("products").await.unwrap().is_none());
        set_json(&kv, "products", &vec![1, 2, 3]).await.unwrap();
        let back: Option<Vec<i32>> = get_json(&kv, "products").await.unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));

        kv.remove("products").await.unwrap();
        kv.remove("products").await.unwrap();
        assert!(kv.get("products").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_kv_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKv::new(dir.path());
        let err = kv.set("../escape", String::new()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_get_json_reports_corruption() {
        let kv = MemoryKv::new();
        kv.set("cart", "{not json".to_owned()).await.unwrap();
        let err = get_json::<Vec<i32>, _>(&kv, "cart").await.unwrap_err();
        assert!(matches!(err, PersistenceError::DataCorruption(_)));
    }
}
