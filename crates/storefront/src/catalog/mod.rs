//! The catalog store.
//!
//! [`CatalogStore`] owns the in-memory product list and writes every change
//! through to a [`CatalogBackend`] before applying it. Listeners registered
//! with [`CatalogStore::subscribe`] are told about each successful change.
//!
//! # Initialization
//!
//! ```text
//! Uninitialized ──(backend has records)──▶ LoadingExisting ──▶ Ready
//!       │
//!       └──────(backend is empty)────────▶ Seeding ──────────▶ Ready
//! ```
//!
//! Seeding asks a [`ProductGenerator`] for products and falls back to
//! [`fallback_catalog`] on any failure. An in-process lock serializes
//! [`CatalogStore::initialize`]; the persisted seed marker keeps a catalog
//! that was emptied on purpose from being seeded again.

pub mod fallback;
pub mod view;

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::Rng;
use serde::Serialize;
use souk_core::{NewProduct, Product, ProductError, ProductId, ProductUpdate, Rating};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::db::catalog::products_from_documents;
use crate::db::{CatalogBackend, PersistenceError};
use crate::observe::{Listeners, Subscription};
use crate::services::generator::ProductGenerator;

pub use fallback::fallback_catalog;
pub use view::{CatalogQuery, FEATURED_COUNT, PriceRange, SortKey, derive_view, featured};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The backend write or read failed; the in-memory catalog is unchanged.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The product data is invalid.
    #[error("invalid product: {0}")]
    Invalid(#[from] ProductError),
}

/// Initialization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitPhase {
    Uninitialized,
    LoadingExisting,
    Seeding,
    Ready,
}

/// Where seeded products came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    Generated,
    Fallback,
}

/// What [`CatalogStore::initialize`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum InitOutcome {
    /// The store was already initialized.
    AlreadyReady,
    /// Existing records were loaded.
    Loaded { count: usize },
    /// The empty backend was seeded.
    Seeded { count: usize, source: SeedSource },
    /// The backend is empty but was seeded before; nothing was written.
    Empty,
}

impl fmt::Display for InitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyReady => f.write_str("catalog already initialized"),
            Self::Loaded { count } => write!(f, "loaded {count} existing products"),
            Self::Seeded { count, source } => {
                let source = match source {
                    SeedSource::Generated => "generated",
                    SeedSource::Fallback => "fallback",
                };
                write!(f, "seeded {count} {source} products")
            }
            Self::Empty => f.write_str("catalog is empty (already seeded once)"),
        }
    }
}

/// A change to the catalog, delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    Created(Product),
    Updated(Product),
    Deleted(ProductId),
    /// The whole list was replaced (initialization or a remote snapshot).
    Replaced { count: usize },
}

struct CatalogState {
    products: Vec<Product>,
    phase: InitPhase,
}

/// The authoritative product list.
pub struct CatalogStore<B> {
    backend: B,
    state: RwLock<CatalogState>,
    init_lock: Mutex<()>,
    listeners: Listeners<CatalogEvent>,
    seed_count: usize,
}

impl<B: CatalogBackend> CatalogStore<B> {
    /// Create an uninitialized store over `backend`.
    ///
    /// `seed_count` is how many products to request when seeding.
    #[must_use]
    pub fn new(backend: B, seed_count: usize) -> Self {
        Self {
            backend,
            state: RwLock::new(CatalogState {
                products: Vec::new(),
                phase: InitPhase::Uninitialized,
            }),
            init_lock: Mutex::new(()),
            listeners: Listeners::new(),
            seed_count,
        }
    }

    /// The persistence backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: InitPhase) {
        debug!(?phase, "catalog phase");
        self.write().phase = phase;
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of every product, in catalog order.
    #[must_use]
    pub fn list(&self) -> Vec<Product> {
        self.read().products.clone()
    }

    /// Look up a product by id.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<Product> {
        self.read().products.iter().find(|p| &p.id == id).cloned()
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().products.len()
    }

    /// Whether the catalog has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current initialization phase.
    #[must_use]
    pub fn phase(&self) -> InitPhase {
        self.read().phase
    }

    /// Register a change listener. Dropping the subscription unregisters it.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe(
        &self,
        listener: impl Fn(&CatalogEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.listeners.subscribe(listener)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a product. A missing rating becomes a random whole rating of 4 or 5.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for invalid data and
    /// `CatalogError::Persistence` if the write fails; the catalog is
    /// unchanged in both cases.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create(&self, new: NewProduct) -> Result<Product, CatalogError> {
        new.validate()?;
        let mut product = new.into_product(ProductId::generate(), default_rating())?;
        product.id = self.backend.create(&product).await?;

        {
            let mut state = self.write();
            if let Some(slot) = state.products.iter_mut().find(|p| p.id == product.id) {
                slot.clone_from(&product);
            } else {
                state.products.push(product.clone());
            }
        }
        info!(id = %product.id, "product created");
        self.listeners.notify(&CatalogEvent::Created(product.clone()));
        Ok(product)
    }

    /// Replace the product with the same id. Returns `false`, without
    /// writing anything, when no such product exists.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for invalid data and
    /// `CatalogError::Persistence` if the write fails.
    #[instrument(skip(self, product), fields(id = %product.id))]
    pub async fn update(&self, product: Product) -> Result<bool, CatalogError> {
        product.validate()?;
        if self.get(&product.id).is_none() {
            debug!("update of unknown product ignored");
            return Ok(false);
        }

        self.backend.put(&product).await?;
        self.replace_one(&product);
        info!("product updated");
        self.listeners.notify(&CatalogEvent::Updated(product));
        Ok(true)
    }

    /// Apply a partial update. Returns `None` when no such product exists.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the merged product is invalid and
    /// `CatalogError::Persistence` if the write fails.
    #[instrument(skip(self, changes))]
    pub async fn patch(
        &self,
        id: &ProductId,
        changes: &ProductUpdate,
    ) -> Result<Option<Product>, CatalogError> {
        let Some(current) = self.get(id) else {
            debug!("patch of unknown product ignored");
            return Ok(None);
        };
        let updated = changes.apply(&current)?;
        if changes.is_empty() {
            return Ok(Some(updated));
        }

        self.backend.patch(&updated, changes).await?;
        self.replace_one(&updated);
        info!("product patched");
        self.listeners.notify(&CatalogEvent::Updated(updated.clone()));
        Ok(Some(updated))
    }

    /// Remove a product. Returns `false` when no such product exists.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Persistence` if the write fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &ProductId) -> Result<bool, CatalogError> {
        if self.get(id).is_none() {
            debug!("delete of unknown product ignored");
            return Ok(false);
        }

        self.backend.delete(id).await?;
        self.write().products.retain(|p| &p.id != id);
        info!("product deleted");
        self.listeners.notify(&CatalogEvent::Deleted(id.clone()));
        Ok(true)
    }

    fn replace_one(&self, product: &Product) {
        let mut state = self.write();
        if let Some(slot) = state.products.iter_mut().find(|p| p.id == product.id) {
            slot.clone_from(product);
        }
    }

    fn replace_all(&self, products: Vec<Product>, phase: InitPhase) {
        let count = products.len();
        {
            let mut state = self.write();
            state.products = products;
            state.phase = phase;
        }
        self.listeners.notify(&CatalogEvent::Replaced { count });
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Load existing products, or seed an empty backend.
    ///
    /// Safe to call concurrently and repeatedly: only the first call does
    /// any work.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Persistence` if the backend cannot be read; the
    /// store stays `Uninitialized` so the call can be repeated. Generator
    /// failures are not errors.
    #[instrument(skip(self, generator), fields(seed_count = self.seed_count))]
    pub async fn initialize<G: ProductGenerator>(
        &self,
        generator: &G,
    ) -> Result<InitOutcome, CatalogError> {
        let _guard = self.init_lock.lock().await;
        if self.phase() == InitPhase::Ready {
            return Ok(InitOutcome::AlreadyReady);
        }

        let existing = self.backend.load().await?;
        if !existing.is_empty() {
            self.set_phase(InitPhase::LoadingExisting);
            let count = existing.len();
            self.replace_all(existing, InitPhase::Ready);
            info!(count, "catalog loaded");
            return Ok(InitOutcome::Loaded { count });
        }

        if self.backend.is_seeded().await? {
            self.replace_all(Vec::new(), InitPhase::Ready);
            info!("catalog empty and already seeded, not seeding again");
            return Ok(InitOutcome::Empty);
        }

        self.set_phase(InitPhase::Seeding);
        let (products, source) = match generator.generate(self.seed_count).await {
            Ok(generated) => {
                let products = dedup_by_id(generated);
                if products.is_empty() {
                    warn!("generator returned no products, using fallback catalog");
                    (fallback_catalog(), SeedSource::Fallback)
                } else {
                    (products, SeedSource::Generated)
                }
            }
            Err(e) => {
                warn!(error = %e, "seed generation failed, using fallback catalog");
                (fallback_catalog(), SeedSource::Fallback)
            }
        };

        let count = products.len();
        match self.backend.seed(&products).await {
            Ok(()) => {
                if let Err(e) = self.backend.set_seeded(true).await {
                    warn!(error = %e, "failed to persist seed marker");
                }
            }
            Err(e) => warn!(error = %e, "failed to persist seeded catalog, serving from memory"),
        }

        self.replace_all(products, InitPhase::Ready);
        info!(count, ?source, "catalog seeded");
        Ok(InitOutcome::Seeded { count, source })
    }

    /// Replace the list with a snapshot pushed by the backend.
    ///
    /// Ignored until the store is `Ready`; unchanged snapshots notify nobody.
    pub fn apply_snapshot(&self, products: Vec<Product>) {
        {
            let state = self.read();
            if state.phase != InitPhase::Ready || state.products == products {
                return;
            }
        }
        debug!(count = products.len(), "applying remote snapshot");
        self.replace_all(products, InitPhase::Ready);
    }
}

impl<B: CatalogBackend + 'static> CatalogStore<B> {
    /// Follow the backend's change feed, if it has one.
    ///
    /// The task holds only a weak handle: once the store is dropped, the next
    /// snapshot ends the task without being applied.
    pub fn watch(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut changes = self.backend.changes()?;
        let store = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(docs) => {
                        let Some(store) = store.upgrade() else {
                            debug!("catalog dropped, stopping watcher");
                            break;
                        };
                        store.apply_snapshot(products_from_documents(&docs));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "catalog watcher lagged, waiting for next snapshot");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }))
    }
}

fn default_rating() -> Rating {
    Rating::stars(rand::rng().random_range(4..=5))
}

/// Keep the first product for each id.
fn dedup_by_id(products: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{
        DocumentCatalog, DocumentStore, KeyValueStore, KvCatalog, MemoryDocumentStore, MemoryKv,
        keys,
    };
    use crate::services::generator::GeneratorError;
    use souk_core::{Category, ImageRef, Price};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FailingGenerator;

    impl ProductGenerator for FailingGenerator {
        async fn generate(&self, _count: usize) -> Result<Vec<Product>, GeneratorError> {
            Err(GeneratorError::NotConfigured)
        }
    }

    struct FixedGenerator {
        products: Vec<Product>,
        calls: AtomicUsize,
    }

    impl FixedGenerator {
        fn new(products: Vec<Product>) -> Self {
            Self {
                products,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ProductGenerator for FixedGenerator {
        async fn generate(&self, _count: usize) -> Result<Vec<Product>, GeneratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(self.products.clone())
        }
    }

    /// Reads succeed (empty), writes fail.
    struct ReadOnlyKv;

    impl KeyValueStore for ReadOnlyKv {
        async fn get(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: String) -> Result<(), PersistenceError> {
            Err(PersistenceError::Io(std::io::Error::other("disk full")))
        }

        async fn remove(&self, _key: &str) -> Result<(), PersistenceError> {
            Err(PersistenceError::Io(std::io::Error::other("disk full")))
        }
    }

    fn product(id: &str, price: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Item {id}"),
            category: Category::Women,
            price: Price::from_units(price),
            original_price: None,
            rating: Rating::stars(4),
            image_url: ImageRef::parse("https://picsum.photos/600/900").unwrap(),
            description: String::new(),
        }
    }

    fn new_product(name: &str) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            category: Category::Kids,
            price: Price::from_units(120),
            original_price: None,
            rating: None,
            image_url: ImageRef::parse("https://picsum.photos/600/900").unwrap(),
            description: "Soft cotton.".to_owned(),
        }
    }

    fn local_store() -> CatalogStore<KvCatalog<MemoryKv>> {
        CatalogStore::new(KvCatalog::new(MemoryKv::new()), 12)
    }

    async fn ready_store() -> CatalogStore<KvCatalog<MemoryKv>> {
        let store = local_store();
        store.initialize(&FailingGenerator).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_failing_generator_seeds_fallback() {
        let store = local_store();
        assert_eq!(store.phase(), InitPhase::Uninitialized);

        let outcome = store.initialize(&FailingGenerator).await.unwrap();
        assert_eq!(
            outcome,
            InitOutcome::Seeded {
                count: 8,
                source: SeedSource::Fallback
            }
        );
        assert_eq!(store.phase(), InitPhase::Ready);
        assert_eq!(store.list(), fallback_catalog());
        assert!(store.backend().is_seeded().await.unwrap());
        assert_eq!(store.backend().load().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_generated_products_are_deduplicated() {
        let generator = FixedGenerator::new(vec![
            product("g1", 100),
            product("g2", 200),
            product("g1", 300),
        ]);
        let store = local_store();

        let outcome = store.initialize(&generator).await.unwrap();
        assert_eq!(
            outcome,
            InitOutcome::Seeded {
                count: 2,
                source: SeedSource::Generated
            }
        );
        assert_eq!(store.get(&ProductId::new("g1")).unwrap().price, Price::from_units(100));
    }

    #[tokio::test]
    async fn test_empty_generator_output_falls_back() {
        let store = local_store();
        let outcome = store.initialize(&FixedGenerator::new(Vec::new())).await.unwrap();
        assert!(matches!(
            outcome,
            InitOutcome::Seeded {
                source: SeedSource::Fallback,
                ..
            }
        ));
        assert!(!store.is_empty());
    }

    #[tokio::test]
    async fn test_existing_records_are_loaded_not_seeded() {
        let backend = KvCatalog::new(MemoryKv::new());
        backend.seed(&[product("p1", 100)]).await.unwrap();
        let store = CatalogStore::new(backend, 12);
        let generator = FixedGenerator::new(vec![product("g1", 1)]);

        let outcome = store.initialize(&generator).await.unwrap();
        assert_eq!(outcome, InitOutcome::Loaded { count: 1 });
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.initialize(&generator).await.unwrap(), InitOutcome::AlreadyReady);
    }

    #[tokio::test]
    async fn test_seed_marker_with_empty_backend_stays_empty() {
        let kv = MemoryKv::new();
        kv.set(keys::CATALOG_SEEDED, "true".to_owned()).await.unwrap();
        let store = CatalogStore::new(KvCatalog::new(kv), 12);

        let outcome = store.initialize(&FailingGenerator).await.unwrap();
        assert_eq!(outcome, InitOutcome::Empty);
        assert_eq!(store.phase(), InitPhase::Ready);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_initialize_seeds_once() {
        let store = Arc::new(local_store());
        let generator = Arc::new(FixedGenerator::new(vec![product("g1", 1)]));

        let a = {
            let (store, generator) = (Arc::clone(&store), Arc::clone(&generator));
            tokio::spawn(async move { store.initialize(&*generator).await.unwrap() })
        };
        let b = {
            let (store, generator) = (Arc::clone(&store), Arc::clone(&generator));
            tokio::spawn(async move { store.initialize(&*generator).await.unwrap() })
        };
        let outcomes = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert!(outcomes.contains(&InitOutcome::AlreadyReady));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_seed_write_failure_still_serves_products() {
        let store = CatalogStore::new(KvCatalog::new(ReadOnlyKv), 12);
        let outcome = store.initialize(&FailingGenerator).await.unwrap();
        assert!(matches!(outcome, InitOutcome::Seeded { count: 8, .. }));
        assert_eq!(store.len(), 8);
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_default_rating() {
        let store = ready_store().await;
        let created = store.create(new_product("Kids Hoodie")).await.unwrap();

        assert!(created.rating == Rating::stars(4) || created.rating == Rating::stars(5));
        assert_eq!(store.len(), 9);
        assert_eq!(store.list().last(), Some(&created));
        let persisted = store.backend().load().await.unwrap();
        assert!(persisted.contains(&created));
    }

    #[tokio::test]
    async fn test_create_keeps_explicit_rating() {
        let store = ready_store().await;
        let mut new = new_product("Cap");
        new.rating = Some(Rating::stars(2));
        assert_eq!(store.create(new).await.unwrap().rating, Rating::stars(2));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_catalog_unchanged() {
        let store = CatalogStore::new(KvCatalog::new(ReadOnlyKv), 12);
        store.initialize(&FailingGenerator).await.unwrap();
        let before = store.list();

        let err = store.create(new_product("Scarf")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Persistence(_)));

        let mut changed = before[0].clone();
        changed.name = "Renamed".to_owned();
        assert!(store.update(changed).await.is_err());
        assert!(store.delete(&before[1].id).await.is_err());

        assert_eq!(store.list(), before);
    }

    #[tokio::test]
    async fn test_update_unknown_is_noop_without_write() {
        let kv = MemoryKv::new();
        let store = CatalogStore::new(KvCatalog::new(kv.clone()), 12);
        assert!(!store.update(product("ghost", 10)).await.unwrap());
        assert!(kv.get(keys::PRODUCTS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_in_place() {
        let store = ready_store().await;
        let mut shirt = store.get(&ProductId::new("prod-4")).unwrap();
        shirt.price = Price::from_units(330);
        assert!(store.update(shirt.clone()).await.unwrap());

        assert_eq!(store.list()[3], shirt);
        assert_eq!(store.backend().load().await.unwrap()[3], shirt);
    }

    #[tokio::test]
    async fn test_patch_validates_and_applies() {
        let store = ready_store().await;
        let id = ProductId::new("prod-2");

        let bad = ProductUpdate {
            original_price: Some(Some(Price::from_units(10))),
            ..ProductUpdate::default()
        };
        assert!(matches!(
            store.patch(&id, &bad).await,
            Err(CatalogError::Invalid(ProductError::OriginalPriceBelowPrice { .. }))
        ));
        assert_eq!(store.get(&id).unwrap().original_price, Some(Price::from_units(550)));

        let clear = ProductUpdate {
            original_price: Some(None),
            ..ProductUpdate::default()
        };
        let patched = store.patch(&id, &clear).await.unwrap().unwrap();
        assert_eq!(patched.original_price, None);
        assert_eq!(store.get(&id), Some(patched));

        assert!(
            store
                .patch(&ProductId::new("ghost"), &clear)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_delete_removes_and_missing_is_noop() {
        let store = ready_store().await;
        let id = ProductId::new("prod-3");
        assert!(store.delete(&id).await.unwrap());
        assert!(store.get(&id).is_none());
        assert!(!store.delete(&id).await.unwrap());
        assert_eq!(store.len(), 7);
    }

    #[tokio::test]
    async fn test_listeners_are_notified_until_unsubscribed() {
        let store = ready_store().await;
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));

        let sink = Arc::clone(&events);
        let subscription = store.subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        let created = store.create(new_product("Beanie")).await.unwrap();
        store.delete(&created.id).await.unwrap();
        drop(subscription);
        store.delete(&ProductId::new("prod-1")).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                CatalogEvent::Created(created.clone()),
                CatalogEvent::Deleted(created.id.clone()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_mutation_does_not_notify() {
        let store = CatalogStore::new(KvCatalog::new(ReadOnlyKv), 12);
        store.initialize(&FailingGenerator).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _subscription = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let _ = store.create(new_product("Gloves")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_watch_applies_remote_snapshots() {
        let docs = MemoryDocumentStore::new();
        let store = Arc::new(CatalogStore::new(
            DocumentCatalog::new(docs.clone(), MemoryKv::new()),
            12,
        ));
        store.initialize(&FailingGenerator).await.unwrap();
        let handle = store.watch().unwrap();

        docs.delete("products", "prod-1").await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while store.len() != 7 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        drop(store);
        docs.delete("products", "prod-2").await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_local_backend_has_no_watcher() {
        let store = Arc::new(local_store());
        assert!(store.watch().is_none());
    }
}
