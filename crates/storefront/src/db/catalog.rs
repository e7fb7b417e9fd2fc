//! Catalog persistence.
//!
//! The catalog can live in a key-value store (the whole product list under
//! one key) or in a document collection (one document per product). Both
//! keep the "already seeded" marker in a key-value store.

use std::future::Future;

use serde::Deserialize;
use serde_json::{Map, Value};
use souk_core::{Product, ProductId, ProductUpdate};
use tokio::sync::{Mutex, broadcast};
use tracing::{instrument, warn};

use crate::config::{CatalogBackendKind, CatalogConfig, ConfigError};

use super::documents::{Document, DocumentStore, MemoryDocumentStore};
use super::http::HttpDocumentStore;
use super::kv::{FileKv, MemoryKv};
use super::{KeyValueStore, PersistenceError, get_json, keys, set_json};

/// Collection holding product documents.
pub const PRODUCTS_COLLECTION: &str = "products";

/// Storage operations the catalog store needs.
pub trait CatalogBackend: Send + Sync {
    /// Load every stored product. Records that fail validation are skipped.
    fn load(&self) -> impl Future<Output = Result<Vec<Product>, PersistenceError>> + Send;

    /// Persist a new product and return its final id.
    ///
    /// The draft's id is provisional; backends that assign their own ids
    /// return the assigned one.
    fn create(
        &self,
        draft: &Product,
    ) -> impl Future<Output = Result<ProductId, PersistenceError>> + Send;

    /// Store `product`, replacing any record with the same id.
    fn put(&self, product: &Product) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Persist a partial update. `updated` is the already-merged product.
    fn patch(
        &self,
        updated: &Product,
        changes: &ProductUpdate,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Delete a product. Deleting a missing product is not an error.
    fn delete(&self, id: &ProductId) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Write a freshly seeded catalog, keeping the given ids.
    fn seed(&self, products: &[Product])
    -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Whether the persisted seed marker is set.
    fn is_seeded(&self) -> impl Future<Output = Result<bool, PersistenceError>> + Send;

    /// Set or clear the persisted seed marker.
    fn set_seeded(&self, seeded: bool)
    -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Change feed of full-collection snapshots, when the backend has one.
    fn changes(&self) -> Option<broadcast::Receiver<Vec<Document>>>;
}

async fn read_marker<K: KeyValueStore>(kv: &K) -> Result<bool, PersistenceError> {
    Ok(get_json::<bool, _>(kv, keys::CATALOG_SEEDED)
        .await?
        .unwrap_or(false))
}

async fn write_marker<K: KeyValueStore>(kv: &K, seeded: bool) -> Result<(), PersistenceError> {
    if seeded {
        set_json(kv, keys::CATALOG_SEEDED, &true).await
    } else {
        kv.remove(keys::CATALOG_SEEDED).await
    }
}

// =============================================================================
// Document conversion
// =============================================================================

/// Encode a product as document fields (everything but the id).
///
/// # Errors
///
/// Returns an error if the product does not serialize to a JSON object.
pub fn product_fields(product: &Product) -> Result<Map<String, Value>, PersistenceError> {
    match serde_json::to_value(product)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(PersistenceError::DataCorruption(format!(
            "product encoded as {other}"
        ))),
    }
}

/// Decode a document into a product, using the document id.
///
/// # Errors
///
/// Returns an error if the document fields do not form a valid product.
pub fn document_product(doc: &Document) -> Result<Product, PersistenceError> {
    let mut data = doc.data.clone();
    data.insert("id".to_owned(), Value::String(doc.id.clone()));
    serde_json::from_value(Value::Object(data))
        .map_err(|e| PersistenceError::DataCorruption(format!("{}: {e}", doc.id)))
}

/// Decode every valid product in a collection snapshot, skipping the rest.
#[must_use]
pub fn products_from_documents(docs: &[Document]) -> Vec<Product> {
    docs.iter()
        .filter_map(|doc| match document_product(doc) {
            Ok(product) => Some(product),
            Err(e) => {
                warn!(id = %doc.id, error = %e, "skipping invalid product document");
                None
            }
        })
        .collect()
}

/// The fields touched by `changes`, holding their merged values from
/// `updated`. A cleared field maps to `null`.
fn patch_fields(
    updated: &Product,
    changes: &ProductUpdate,
) -> Result<Map<String, Value>, PersistenceError> {
    let merged = product_fields(updated)?;
    let Value::Object(mut partial) = serde_json::to_value(changes)? else {
        return Err(PersistenceError::DataCorruption(
            "update did not encode as an object".to_owned(),
        ));
    };
    for (field, value) in &mut partial {
        *value = merged.get(field).cloned().unwrap_or(Value::Null);
    }
    Ok(partial)
}

// =============================================================================
// Key-value catalog
// =============================================================================

/// Catalog stored as one JSON array under the `products` key.
pub struct KvCatalog<K> {
    kv: K,
    write_lock: Mutex<()>,
}

impl<K: KeyValueStore> KvCatalog<K> {
    /// Wrap a key-value store.
    #[must_use]
    pub fn new(kv: K) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// The underlying key-value store.
    pub const fn kv(&self) -> &K {
        &self.kv
    }

    /// Stored products, plus the raw records that failed to decode.
    async fn read_records(&self) -> Result<(Vec<Product>, Vec<Value>), PersistenceError> {
        let raw: Vec<Value> = get_json(&self.kv, keys::PRODUCTS).await?.unwrap_or_default();
        let mut products = Vec::with_capacity(raw.len());
        let mut undecodable = Vec::new();
        for value in raw {
            match Product::deserialize(&value) {
                Ok(product) => products.push(product),
                Err(e) => {
                    warn!(error = %e, "skipping invalid stored product");
                    undecodable.push(value);
                }
            }
        }
        Ok((products, undecodable))
    }

    /// Apply `change` to the stored products. Records that fail to decode
    /// are written back untouched after the products.
    async fn modify(
        &self,
        change: impl FnOnce(&mut Vec<Product>) + Send,
    ) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let (mut products, undecodable) = self.read_records().await?;
        change(&mut products);

        let mut records = products
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        records.extend(undecodable);
        set_json(&self.kv, keys::PRODUCTS, &records).await
    }
}

impl<K: KeyValueStore> CatalogBackend for KvCatalog<K> {
    async fn load(&self) -> Result<Vec<Product>, PersistenceError> {
        Ok(self.read_records().await?.0)
    }

    #[instrument(skip(self, draft), fields(id = %draft.id))]
    async fn create(&self, draft: &Product) -> Result<ProductId, PersistenceError> {
        let product = draft.clone();
        let id = product.id.clone();
        self.modify(move |products| products.push(product)).await?;
        Ok(id)
    }

    #[instrument(skip(self, product), fields(id = %product.id))]
    async fn put(&self, product: &Product) -> Result<(), PersistenceError> {
        let product = product.clone();
        self.modify(move |products| {
            if let Some(slot) = products.iter_mut().find(|p| p.id == product.id) {
                *slot = product;
            } else {
                products.push(product);
            }
        })
        .await
    }

    async fn patch(
        &self,
        updated: &Product,
        _changes: &ProductUpdate,
    ) -> Result<(), PersistenceError> {
        self.put(updated).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &ProductId) -> Result<(), PersistenceError> {
        let id = id.clone();
        self.modify(move |products| products.retain(|p| p.id != id))
            .await
    }

    #[instrument(skip(self, products), fields(count = products.len()))]
    async fn seed(&self, products: &[Product]) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        set_json(&self.kv, keys::PRODUCTS, products).await
    }

    async fn is_seeded(&self) -> Result<bool, PersistenceError> {
        read_marker(&self.kv).await
    }

    async fn set_seeded(&self, seeded: bool) -> Result<(), PersistenceError> {
        write_marker(&self.kv, seeded).await
    }

    fn changes(&self) -> Option<broadcast::Receiver<Vec<Document>>> {
        None
    }
}

// =============================================================================
// Document catalog
// =============================================================================

/// Catalog stored as one document per product in the `products` collection.
pub struct DocumentCatalog<D, K> {
    docs: D,
    markers: K,
}

impl<D: DocumentStore, K: KeyValueStore> DocumentCatalog<D, K> {
    /// Combine a document store with a key-value store for the seed marker.
    #[must_use]
    pub const fn new(docs: D, markers: K) -> Self {
        Self { docs, markers }
    }

    /// The underlying document store.
    pub const fn documents(&self) -> &D {
        &self.docs
    }
}

impl<D: DocumentStore, K: KeyValueStore> CatalogBackend for DocumentCatalog<D, K> {
    async fn load(&self) -> Result<Vec<Product>, PersistenceError> {
        let docs = self.docs.snapshot(PRODUCTS_COLLECTION).await?;
        Ok(products_from_documents(&docs))
    }

    async fn create(&self, draft: &Product) -> Result<ProductId, PersistenceError> {
        let id = self
            .docs
            .create(PRODUCTS_COLLECTION, product_fields(draft)?)
            .await?;
        Ok(ProductId::new(id))
    }

    async fn put(&self, product: &Product) -> Result<(), PersistenceError> {
        self.docs
            .set(
                PRODUCTS_COLLECTION,
                product.id.as_str(),
                product_fields(product)?,
            )
            .await
    }

    async fn patch(
        &self,
        updated: &Product,
        changes: &ProductUpdate,
    ) -> Result<(), PersistenceError> {
        self.docs
            .update(
                PRODUCTS_COLLECTION,
                updated.id.as_str(),
                patch_fields(updated, changes)?,
            )
            .await
    }

    async fn delete(&self, id: &ProductId) -> Result<(), PersistenceError> {
        self.docs.delete(PRODUCTS_COLLECTION, id.as_str()).await
    }

    #[instrument(skip(self, products), fields(count = products.len()))]
    async fn seed(&self, products: &[Product]) -> Result<(), PersistenceError> {
        for product in products {
            self.put(product).await?;
        }
        Ok(())
    }

    async fn is_seeded(&self) -> Result<bool, PersistenceError> {
        read_marker(&self.markers).await
    }

    async fn set_seeded(&self, seeded: bool) -> Result<(), PersistenceError> {
        write_marker(&self.markers, seeded).await
    }

    fn changes(&self) -> Option<broadcast::Receiver<Vec<Document>>> {
        Some(self.docs.subscribe(PRODUCTS_COLLECTION))
    }
}

// =============================================================================
// Runtime selection
// =============================================================================

/// The catalog backends selectable at startup.
pub enum AnyCatalogBackend {
    /// Local files under the data directory.
    Local(KvCatalog<FileKv>),
    /// In-process document collection (tests, demos).
    Memory(DocumentCatalog<MemoryDocumentStore, MemoryKv>),
    /// Remote document service, seed marker kept locally.
    Remote(DocumentCatalog<HttpDocumentStore, FileKv>),
}

impl AnyCatalogBackend {
    /// Build the backend selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the remote backend is selected without a
    /// document service or its HTTP client cannot be built.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, ConfigError> {
        match config.backend {
            CatalogBackendKind::Local => {
                Ok(Self::Local(KvCatalog::new(FileKv::new(config.data_dir.clone()))))
            }
            CatalogBackendKind::Memory => Ok(Self::Memory(DocumentCatalog::new(
                MemoryDocumentStore::new(),
                MemoryKv::new(),
            ))),
            CatalogBackendKind::Remote => {
                let document = config.document.as_ref().ok_or_else(|| {
                    ConfigError::MissingEnvVar("STOREFRONT_DOCUMENT_URL".to_string())
                })?;
                let store = HttpDocumentStore::new(
                    &document.url,
                    document.token.clone(),
                    document.poll_interval,
                )
                .map_err(|e| {
                    ConfigError::InvalidEnvVar("STOREFRONT_DOCUMENT_URL".to_string(), e.to_string())
                })?;
                Ok(Self::Remote(DocumentCatalog::new(
                    store,
                    FileKv::new(config.data_dir.clone()),
                )))
            }
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Memory(_) => "memory",
            Self::Remote(_) => "remote",
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $backend:ident => $call:expr) => {
        match $self {
            Self::Local($backend) => $call,
            Self::Memory($backend) => $call,
            Self::Remote($backend) => $call,
        }
    };
}

impl CatalogBackend for AnyCatalogBackend {
    async fn load(&self) -> Result<Vec<Product>, PersistenceError> {
        dispatch!(self, b => b.load().await)
    }

    async fn create(&self, draft: &Product) -> Result<ProductId, PersistenceError> {
        dispatch!(self, b => b.create(draft).await)
    }

    async fn put(&self, product: &Product) -> Result<(), PersistenceError> {
        dispatch!(self, b => b.put(product).await)
    }

    async fn patch(
        &self,
        updated: &Product,
        changes: &ProductUpdate,
    ) -> Result<(), PersistenceError> {
        dispatch!(self, b => b.patch(updated, changes).await)
    }

    async fn delete(&self, id: &ProductId) -> Result<(), PersistenceError> {
        dispatch!(self, b => b.delete(id).await)
    }

    async fn seed(&self, products: &[Product]) -> Result<(), PersistenceError> {
        dispatch!(self, b => b.seed(products).await)
    }

    async fn is_seeded(&self) -> Result<bool, PersistenceError> {
        dispatch!(self, b => b.is_seeded().await)
    }

    async fn set_seeded(&self, seeded: bool) -> Result<(), PersistenceError> {
        dispatch!(self, b => b.set_seeded(seeded).await)
    }

    fn changes(&self) -> Option<broadcast::Receiver<Vec<Document>>> {
        dispatch!(self, b => b.changes())
    }
}
