//! Document-collection stores.
//!
//! A document store keeps JSON objects in named collections, addressed by a
//! string id. Subscribers receive the full collection after every change.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use super::PersistenceError;

/// Capacity of each collection's change channel.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id, unique within its collection.
    pub id: String,
    /// Document fields.
    pub data: Map<String, Value>,
}

/// A document-collection store with a change feed.
pub trait DocumentStore: Send + Sync {
    /// All documents in `collection`, in insertion order.
    fn snapshot(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<Vec<Document>, PersistenceError>> + Send;

    /// Subscribe to full-collection snapshots pushed after every change.
    fn subscribe(&self, collection: &str) -> broadcast::Receiver<Vec<Document>>;

    /// Create a document with a store-assigned id.
    fn create(
        &self,
        collection: &str,
        data: Map<String, Value>,
    ) -> impl Future<Output = Result<String, PersistenceError>> + Send;

    /// Create or replace the document with the given id.
    fn set(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Merge `partial` into an existing document.
    ///
    /// Fails with `PersistenceError::NotFound` when the document is absent.
    fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Map<String, Value>,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Delete a document. Deleting a missing document is not an error.
    fn delete(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

// =============================================================================
// In-process store
// =============================================================================

/// In-process document store.
///
/// Cheaply cloneable; clones share the same collections and change feeds.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    channels: Mutex<HashMap<String, broadcast::Sender<Vec<Document>>>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, collection: &str) -> broadcast::Sender<Vec<Document>> {
        self.inner
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_owned())
            .or_insert_with(|| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Apply `mutate` to a collection and publish the resulting snapshot.
    fn mutate<T>(
        &self,
        collection: &str,
        mutate: impl FnOnce(&mut Vec<Document>) -> Result<T, PersistenceError>,
    ) -> Result<T, PersistenceError> {
        let (result, snapshot) = {
            let mut collections = self
                .inner
                .collections
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let docs = collections.entry(collection.to_owned()).or_default();
            let result = mutate(docs)?;
            (result, docs.clone())
        };

        // No receivers is fine; the change is still applied.
        let receivers = self.sender(collection).send(snapshot).unwrap_or(0);
        debug!(collection, receivers, "published collection snapshot");
        Ok(result)
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn snapshot(&self, collection: &str) -> Result<Vec<Document>, PersistenceError> {
        Ok(self
            .inner
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    fn subscribe(&self, collection: &str) -> broadcast::Receiver<Vec<Document>> {
        self.sender(collection).subscribe()
    }

    #[instrument(skip(self, data))]
    async fn create(
        &self,
        collection: &str,
        data: Map<String, Value>,
    ) -> Result<String, PersistenceError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let doc = Document {
            id: id.clone(),
            data,
        };
        self.mutate(collection, |docs| {
            docs.push(doc);
            Ok(())
        })?;
        Ok(id)
    }

    #[instrument(skip(self, data))]
    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<(), PersistenceError> {
        self.mutate(collection, |docs| {
            if let Some(existing) = docs.iter_mut().find(|d| d.id == id) {
                existing.data = data;
            } else {
                docs.push(Document {
                    id: id.to_owned(),
                    data,
                });
            }
            Ok(())
        })
    }

    #[instrument(skip(self, partial))]
    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<(), PersistenceError> {
        self.mutate(collection, |docs| {
            let existing = docs
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| PersistenceError::NotFound(format!("{collection}/{id}")))?;
            for (field, value) in partial {
                if value.is_null() {
                    existing.data.remove(&field);
                } else {
                    existing.data.insert(field, value);
                }
            }
            Ok(())
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<(), PersistenceError> {
        self.mutate(collection, |docs| {
            docs.retain(|d| d.id != id);
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_create_set_update_delete() {
        let store = MemoryDocumentStore::new();

        let id = store
            .create("products", fields(json!({"name": "Tee", "price": "250"})))
            .await
            .unwrap();
        store
            .set("products", "prod-2", fields(json!({"name": "Dress"})))
            .await
            .unwrap();

        let docs = store.snapshot("products").await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, id);
        assert_eq!(docs[1].id, "prod-2");

        store
            .update(
                "products",
                "prod-2",
                fields(json!({"price": "450", "name": null})),
            )
            .await
            .unwrap();
        let docs = store.snapshot("products").await.unwrap();
        assert_eq!(docs[1].data.get("price"), Some(&json!("450")));
        assert!(!docs[1].data.contains_key("name"));

        store.delete("products", &id).await.unwrap();
        store.delete("products", &id).await.unwrap();
        assert_eq!(store.snapshot("products").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update("products", "nope", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_subscribers_receive_full_snapshots() {
        let store = MemoryDocumentStore::new();
        let mut rx = store.subscribe("products");

        store
            .set("products", "a", fields(json!({"n": 1})))
            .await
            .unwrap();
        store
            .set("products", "b", fields(json!({"n": 2})))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().len(), 1);
        let second = rx.recv().await.unwrap();
        assert_eq!(
            second.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            ["a", "b"]
        );
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = MemoryDocumentStore::new();
        store.set("products", "a", Map::new()).await.unwrap();
        assert!(store.snapshot("orders").await.unwrap().is_empty());
    }
}
