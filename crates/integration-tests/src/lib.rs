//! Integration tests for Souk.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p souk-integration-tests
//! ```
//!
//! Each test starts its own storefront on an ephemeral port and talks to it
//! over HTTP with a cookie-keeping client, so sessions behave as they do in
//! a browser. No external services are needed: catalogs use the in-process
//! or local-file backends and seeding never reaches the network.
//!
//! # Test Categories
//!
//! - `storefront_api` - Shopper and admin journeys over HTTP
//! - `catalog_lifecycle` - Seeding, restarts and remote change feeds
//! - `cart_and_view` - Cart and browse scenarios against the stores directly

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use souk_core::{Category, ImageRef, Price, Product, ProductId, Rating};
use souk_storefront::catalog::{CatalogStore, InitOutcome};
use souk_storefront::config::{CatalogConfig, StorefrontConfig};
use souk_storefront::db::AnyCatalogBackend;
use souk_storefront::routes;
use souk_storefront::services::generator::{GeneratorError, ProductGenerator};
use souk_storefront::state::{AppState, Catalog};

/// A storefront served on `127.0.0.1` for the duration of a test.
pub struct TestServer {
    pub base_url: String,
    pub catalog: Arc<Catalog>,
    /// Client with its own cookie jar (one browser session).
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server whose seeding always falls back.
    pub async fn start(catalog: CatalogConfig) -> Self {
        Self::start_with(catalog, &FailingGenerator).await.0
    }

    /// Start a server, initializing the catalog with `generator`.
    pub async fn start_with<G: ProductGenerator>(
        catalog: CatalogConfig,
        generator: &G,
    ) -> (Self, InitOutcome) {
        let config = StorefrontConfig::with_catalog("http://127.0.0.1", catalog);
        let backend =
            AnyCatalogBackend::from_config(&config.catalog).expect("Failed to build backend");
        let store = Arc::new(CatalogStore::new(backend, config.seed_count));
        let outcome = store
            .initialize(generator)
            .await
            .expect("Failed to initialize catalog");

        (Self::serve(config, store).await, outcome)
    }

    /// Serve an already initialized catalog.
    pub async fn serve(config: StorefrontConfig, catalog: Arc<Catalog>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let app = routes::app(AppState::new(config, Arc::clone(&catalog)));
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            catalog,
            client: browser(),
            handle,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A fresh client with an empty cookie jar.
#[must_use]
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Log `client` in with the default admin credentials.
pub async fn login_admin(server: &TestServer, client: &reqwest::Client) {
    let resp = client
        .post(server.url("/api/auth/login"))
        .json(&serde_json::json!({"username": "admin", "password": "password"}))
        .send()
        .await
        .expect("Login request failed");
    assert!(resp.status().is_success(), "login failed: {}", resp.status());
}

/// A valid product for tests.
#[must_use]
pub fn product(id: &str, price: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Test item {id}"),
        category: Category::Men,
        price: Price::from_units(price),
        original_price: None,
        rating: Rating::stars(4),
        image_url: ImageRef::parse(&format!("https://picsum.photos/seed/{id}/600/900"))
            .expect("valid image url"),
        description: String::new(),
    }
}

/// Wait until `check` passes, polling for up to two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// =============================================================================
// Generators
// =============================================================================

/// A generator that always fails.
pub struct FailingGenerator;

impl ProductGenerator for FailingGenerator {
    async fn generate(&self, _count: usize) -> Result<Vec<Product>, GeneratorError> {
        Err(GeneratorError::Parse("forced failure".to_string()))
    }
}

/// A generator that returns fixed products and counts its calls.
pub struct CountingGenerator {
    products: Vec<Product>,
    calls: AtomicUsize,
}

impl CountingGenerator {
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self {
            products,
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `generate` ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProductGenerator for CountingGenerator {
    async fn generate(&self, count: usize) -> Result<Vec<Product>, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Give concurrent initializers a chance to race.
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(self.products.iter().take(count).cloned().collect())
    }
}
