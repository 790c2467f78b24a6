/// Document store abstraction layer
///
/// The engine persists three JSON documents: the base catalog, the restaurants
/// fetched through AI enrichment, and the user interaction log. Each is read and
/// overwritten as a whole ("last write wins"), so the trait is a plain key-value
/// interface over serialized text.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;

use crate::errors::MunchiesError;

pub mod file;

pub use file::FileStore;

/// The documents the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Base restaurant catalog (read-only at request time)
    Catalog,
    /// AI-fetched restaurants (read/append/overwrite-all)
    Fetched,
    /// Interaction log (read/append/overwrite-all)
    Interactions,
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKey::Catalog => write!(f, "catalog"),
            StoreKey::Fetched => write!(f, "fetched"),
            StoreKey::Interactions => write!(f, "interactions"),
        }
    }
}

/// Core abstraction for document persistence.
///
/// All implementations must be Send + Sync to support concurrent access.
/// Writers of the same key are serialized by the owning component, not by the store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the raw document, or `None` if it was never written.
    async fn read(&self, key: StoreKey) -> Result<Option<String>, MunchiesError>;

    /// Replace the document with `contents`.
    async fn write(&self, key: StoreKey, contents: &str) -> Result<(), MunchiesError>;
}

/// Load a document, falling back to `T::default()` when it is absent or unreadable.
///
/// Corruption is logged and swallowed; callers never see an error from this path.
pub async fn load_or_default<T>(store: &dyn DocumentStore, key: StoreKey) -> T
where
    T: DeserializeOwned + Default,
{
    match store.read(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(store = %key, error = %e, "Corrupt document, starting from empty default");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!(store = %key, error = %e, "Document unreadable, starting from empty default");
            T::default()
        }
    }
}

/// Load a document that must exist and parse.
pub async fn load_required<T>(store: &dyn DocumentStore, key: StoreKey) -> Result<T, MunchiesError>
where
    T: DeserializeOwned,
{
    let raw = store
        .read(key)
        .await?
        .ok_or_else(|| MunchiesError::Storage(format!("Required document '{}' is missing", key)))?;
    serde_json::from_str(&raw)
        .map_err(|e| MunchiesError::Storage(format!("Required document '{}' is corrupt: {}", key, e)))
}

/// Serialize and overwrite a document.
pub async fn save<T>(store: &dyn DocumentStore, key: StoreKey, doc: &T) -> Result<(), MunchiesError>
where
    T: Serialize + ?Sized,
{
    let contents = serde_json::to_string_pretty(doc)?;
    store.write(key, &contents).await
}

/// Process-local store for tests and embedders.
#[derive(Default)]
pub struct InMemoryStore {
    documents: RwLock<HashMap<StoreKey, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document before handing the store to the engine.
    pub async fn insert(&self, key: StoreKey, contents: impl Into<String>) {
        self.documents.write().await.insert(key, contents.into());
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn read(&self, key: StoreKey) -> Result<Option<String>, MunchiesError> {
        Ok(self.documents.read().await.get(&key).cloned())
    }

    async fn write(&self, key: StoreKey, contents: &str) -> Result<(), MunchiesError> {
        self.documents.write().await.insert(key, contents.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Doc {
        #[serde(default)]
        items: Vec<u32>,
    }

    #[tokio::test]
    async fn test_load_or_default_absent() {
        let store = InMemoryStore::new();
        let doc: Doc = load_or_default(&store, StoreKey::Fetched).await;
        assert_eq!(doc, Doc::default());
    }

    #[tokio::test]
    async fn test_load_or_default_corrupt() {
        let store = InMemoryStore::new();
        store.insert(StoreKey::Interactions, "{not json").await;
        let doc: Doc = load_or_default(&store, StoreKey::Interactions).await;
        assert!(doc.items.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemoryStore::new();
        save(&store, StoreKey::Fetched, &Doc { items: vec![1, 2] }).await.unwrap();
        let doc: Doc = load_or_default(&store, StoreKey::Fetched).await;
        assert_eq!(doc.items, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_load_required_missing_is_storage_error() {
        let store = InMemoryStore::new();
        let result: Result<Doc, _> = load_required(&store, StoreKey::Catalog).await;
        assert!(matches!(result, Err(MunchiesError::Storage(_))));
    }
}
