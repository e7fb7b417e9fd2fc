//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness check
//! GET    /health/ready                    - Catalog initialized
//!
//! # Products
//! GET    /api/categories                  - Category filter values
//! GET    /api/products                    - Filtered listing (?category&min_price&max_price&q&sort)
//! GET    /api/products/featured           - Home page products
//! GET    /api/products/{id}               - Product detail
//!
//! # Cart (session scoped)
//! GET    /api/cart                        - Cart contents and subtotal
//! GET    /api/cart/count                  - Cart count badge
//! POST   /api/cart/add                    - Add to cart
//! POST   /api/cart/update                 - Update quantity (0 removes)
//! POST   /api/cart/remove                 - Remove item
//!
//! # Checkout
//! POST   /api/checkout                    - Place order, empty the cart
//! GET    /api/order-confirmation          - Last order in this session
//!
//! # Auth
//! POST   /api/auth/login                  - Admin login
//! POST   /api/auth/logout                 - Admin logout
//! GET    /api/auth/status                 - Admin flag
//!
//! # Admin (requires admin session)
//! GET    /api/admin/products              - All products
//! POST   /api/admin/products              - Create product
//! PUT    /api/admin/products/{id}         - Replace product
//! PATCH  /api/admin/products/{id}         - Partial update
//! DELETE /api/admin/products/{id}         - Delete (?confirm=true)
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::catalog::InitPhase;
use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(products::categories))
        .route("/api/products", get(products::index))
        .route("/api/products/featured", get(products::featured_products))
        .route("/api/products/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(cart::show))
        .route("/api/cart/count", get(cart::count))
        .route("/api/cart/add", post(cart::add))
        .route("/api/cart/update", post(cart::update))
        .route("/api/cart/remove", post(cart::remove))
        .route("/api/checkout", post(checkout::place))
        .route("/api/order-confirmation", get(checkout::confirmation))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/status", get(auth::status))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/products",
            get(admin::list).post(admin::create),
        )
        .route(
            "/api/admin/products/{id}",
            axum::routing::put(admin::replace)
                .patch(admin::patch)
                .delete(admin::delete),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(product_routes())
        .merge(cart_routes())
        .merge(auth_routes())
        .merge(admin_routes())
}

/// The complete application: health checks, API routes, sessions, request
/// IDs and request tracing.
///
/// Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable until the catalog has been loaded or seeded.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.catalog().phase() == InitPhase::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::catalog::CatalogStore;
    use crate::config::{CatalogConfig, StorefrontConfig};
    use crate::db::AnyCatalogBackend;
    use crate::middleware::REQUEST_ID_HEADER;
    use crate::services::generator::GeminiGenerator;

    async fn state(initialized: bool) -> AppState {
        let config =
            StorefrontConfig::with_catalog("http://localhost:3000", CatalogConfig::in_memory());
        let backend = AnyCatalogBackend::from_config(&config.catalog).unwrap();
        let catalog = Arc::new(CatalogStore::new(backend, config.seed_count));
        if initialized {
            catalog.initialize(&None::<GeminiGenerator>).await.unwrap();
        }
        AppState::new(config, catalog)
    }

    /// Drives the router like a browser: keeps the session cookie.
    struct Client {
        app: Router,
        cookie: Option<String>,
    }

    impl Client {
        async fn new() -> Self {
            Self {
                app: app(state(true).await),
                cookie: None,
            }
        }

        async fn send(
            &mut self,
            method: Method,
            uri: &str,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(cookie) = &self.cookie {
                builder = builder.header(header::COOKIE, cookie);
            }
            let request = match body {
                Some(json) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.app.clone().oneshot(request).await.unwrap();
            if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
                let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
                self.cookie = Some(pair.to_owned());
            }

            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            if status.is_client_error() || status.is_server_error() {
                assert!(value["error"].is_string(), "error body for {status}: {value}");
            }
            (status, value)
        }

        async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
            self.send(Method::GET, uri, None).await
        }

        async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
            self.send(Method::POST, uri, Some(body)).await
        }
    }

    fn ids(products: &Value) -> Vec<&str> {
        products
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_health_and_request_id() {
        let response = app(state(true).await)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(REQUEST_ID_HEADER, "edge-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "edge-42");
    }

    #[tokio::test]
    async fn test_readiness_follows_catalog_phase() {
        let request = || Request::builder().uri("/health/ready").body(Body::empty()).unwrap();

        let ready = app(state(true).await).oneshot(request()).await.unwrap();
        assert_eq!(ready.status(), StatusCode::OK);

        let cold = app(state(false).await).oneshot(request()).await.unwrap();
        assert_eq!(cold.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_products_unavailable_before_initialization() {
        let response = app(state(false).await)
            .oneshot(Request::builder().uri("/api/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_browse_filters_and_sorts() {
        let mut client = Client::new().await;

        let (status, all) = client.get("/api/products").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all["count"], 8);
        assert_eq!(all["category"], "all");

        let (_, women) = client.get("/api/products?category=women").await;
        assert_eq!(ids(&women["products"]), ["prod-2", "prod-5", "prod-8"]);

        let (_, cheapest) = client.get("/api/products?sort=price-asc").await;
        assert_eq!(ids(&cheapest["products"])[0], "prod-3");

        let (_, mid) = client.get("/api/products?min_price=300&max_price=400").await;
        assert_eq!(ids(&mid["products"]), ["prod-4", "prod-5"]);

        let (_, search) = client.get("/api/products?q=SKIRT").await;
        assert_eq!(ids(&search["products"]), ["prod-8"]);

        let (status, _) = client.get("/api/products?sort=newest").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_categories_featured_and_detail() {
        let mut client = Client::new().await;

        let (_, categories) = client.get("/api/categories").await;
        assert_eq!(categories, json!(["all", "men", "women", "kids"]));

        let (_, featured) = client.get("/api/products/featured").await;
        assert_eq!(ids(&featured), ["prod-1", "prod-2", "prod-3", "prod-4"]);

        let (status, detail) = client.get("/api/products/prod-2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["name"], "Summer Dress");
        assert_eq!(detail["discountPercent"], 18);
        assert_eq!(detail["priceDisplay"], "450.00 EGP");

        let (status, body) = client.get("/api/products/prod-99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found: product prod-99"}));
    }

    #[tokio::test]
    async fn test_cart_flow() {
        let mut client = Client::new().await;

        let (status, cart) = client.get("/api/cart").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["item_count"], 0);

        client
            .post("/api/cart/add", json!({"product_id": "prod-1", "quantity": 2}))
            .await;
        let (_, cart) = client
            .post("/api/cart/add", json!({"product_id": "prod-2"}))
            .await;
        assert_eq!(cart["item_count"], 3);
        assert_eq!(cart["subtotal"], "950");

        let (_, count) = client.get("/api/cart/count").await;
        assert_eq!(count["count"], 3);

        let (_, cart) = client
            .post("/api/cart/update", json!({"product_id": "prod-1", "quantity": 0}))
            .await;
        assert_eq!(ids(&cart["items"]), ["prod-2"]);

        let (_, cart) = client
            .post("/api/cart/remove", json!({"product_id": "prod-2"}))
            .await;
        assert_eq!(cart["item_count"], 0);

        let (status, _) = client
            .post("/api/cart/add", json!({"product_id": "prod-99"}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_carts_are_per_session() {
        let state = state(true).await;
        let mut first = Client {
            app: app(state.clone()),
            cookie: None,
        };
        let mut second = Client {
            app: app(state),
            cookie: None,
        };

        first
            .post("/api/cart/add", json!({"product_id": "prod-1"}))
            .await;

        assert_eq!(first.get("/api/cart/count").await.1["count"], 1);
        assert_eq!(second.get("/api/cart/count").await.1["count"], 0);
    }

    #[tokio::test]
    async fn test_checkout_flow() {
        let mut client = Client::new().await;
        let details = json!({"name": "Mona", "address": "12 Nile St", "phone": "0100000000"});

        let (status, _) = client.get("/api/order-confirmation").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = client.post("/api/checkout", details.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        client
            .post("/api/cart/add", json!({"product_id": "prod-4", "quantity": 2}))
            .await;

        let (status, _) = client
            .post(
                "/api/checkout",
                json!({"name": "Mona", "address": "12 Nile St", "phone": "  "}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(client.get("/api/cart/count").await.1["count"], 2);

        let (status, order) = client.post("/api/checkout", details).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["total"], "700");
        assert_eq!(client.get("/api/cart/count").await.1["count"], 0);

        let (status, confirmation) = client.get("/api/order-confirmation").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmation["id"], order["id"]);
    }

    #[tokio::test]
    async fn test_admin_requires_login() {
        let mut client = Client::new().await;

        let (status, body) = client.get("/api/admin/products").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Admin login required"}));

        let (status, body) = client
            .post("/api/auth/login", json!({"username": "admin", "password": "nope"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Invalid credentials"}));

        let (status, _) = client
            .post("/api/auth/login", json!({"username": "admin", "password": "password"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(client.get("/api/auth/status").await.1["authenticated"], true);

        let (status, products) = client.get("/api/admin/products").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(products.as_array().unwrap().len(), 8);

        client.send(Method::POST, "/api/auth/logout", None).await;
        let (status, _) = client.get("/api/admin/products").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_product_lifecycle() {
        let mut client = Client::new().await;
        client
            .post("/api/auth/login", json!({"username": "admin", "password": "password"}))
            .await;

        let (status, created) = client
            .post(
                "/api/admin/products",
                json!({
                    "name": "Linen Shirt",
                    "category": "men",
                    "price": "300",
                    "imageUrl": "https://picsum.photos/seed/linen/600/900",
                    "description": "Breathable linen."
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_owned();
        let uri = format!("/api/admin/products/{id}");

        let (status, _) = client
            .send(Method::PATCH, &uri, Some(json!({"originalPrice": "100"})))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, patched) = client
            .send(Method::PATCH, &uri, Some(json!({"price": "280", "originalPrice": "300"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["price"], "280");

        let mut replacement = patched.clone();
        replacement["id"] = json!("prod-1");
        let (status, _) = client.send(Method::PUT, &uri, Some(replacement)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = client.send(Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(client.get(&format!("/api/products/{id}")).await.0, StatusCode::OK);

        let (status, _) = client
            .send(Method::DELETE, &format!("{uri}?confirm=true"), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(
            client.get(&format!("/api/products/{id}")).await.0,
            StatusCode::NOT_FOUND
        );

        let (status, _) = client
            .send(Method::DELETE, &format!("{uri}?confirm=true"), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
