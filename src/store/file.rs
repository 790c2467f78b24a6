/// Filesystem-backed implementation of DocumentStore
///
/// One pretty-printed JSON file per key. Writes overwrite the whole file and
/// create missing parent directories. There is no cross-process locking: the
/// deployment model is a single process owning its data directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::Config;
use crate::errors::MunchiesError;
use crate::store::{DocumentStore, StoreKey};

/// JSON-file document store.
pub struct FileStore {
    catalog: PathBuf,
    fetched: PathBuf,
    interactions: PathBuf,
}

impl FileStore {
    pub fn new(catalog: PathBuf, fetched: PathBuf, interactions: PathBuf) -> Self {
        FileStore {
            catalog,
            fetched,
            interactions,
        }
    }

    /// Build the store from the configured data directory and file names.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.catalog_path(),
            config.fetched_path(),
            config.interactions_path(),
        )
    }

    pub fn path(&self, key: StoreKey) -> &Path {
        match key {
            StoreKey::Catalog => &self.catalog,
            StoreKey::Fetched => &self.fetched,
            StoreKey::Interactions => &self.interactions,
        }
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn read(&self, key: StoreKey) -> Result<Option<String>, MunchiesError> {
        let path = self.path(key);
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MunchiesError::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write(&self, key: StoreKey, contents: &str) -> Result<(), MunchiesError> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, contents).await.map_err(|e| {
            MunchiesError::Storage(format!("Failed to write {}: {}", path.display(), e))
        })?;
        tracing::debug!(store = %key, path = %path.display(), bytes = contents.len(), "Document written");
        Ok(())
    }
}
