//! Shopper and admin journeys against a running storefront.

use reqwest::StatusCode;
use serde_json::{Value, json};

use souk_integration_tests::{TestServer, browser, login_admin};
use souk_storefront::config::CatalogConfig;

fn ids(products: &Value) -> Vec<String> {
    products
        .as_array()
        .expect("array of products")
        .iter()
        .map(|p| p["id"].as_str().expect("product id").to_owned())
        .collect()
}

/// Status and JSON body. Error responses must carry `{"error": "..."}`.
async fn read_json(resp: reqwest::Response) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = resp.bytes().await.expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    if status.is_client_error() || status.is_server_error() {
        assert!(body["error"].is_string(), "error body for {status}: {body}");
    }
    (status, body)
}

async fn get_json(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    read_json(client.get(url).send().await.expect("GET failed")).await
}

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    read_json(client.post(url).json(&body).send().await.expect("POST failed")).await
}

// ============================================================================
// Shopper
// ============================================================================

#[tokio::test]
async fn test_browse_add_to_cart_and_check_out() {
    let server = TestServer::start(CatalogConfig::in_memory()).await;
    let client = &server.client;

    let (status, men) =
        get_json(client, server.url("/api/products?category=men&sort=price-desc")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&men["products"]), ["prod-6", "prod-4", "prod-1"]);

    post_json(client, server.url("/api/cart/add"), json!({"product_id": "prod-6"})).await;
    let (_, cart) = post_json(
        client,
        server.url("/api/cart/add"),
        json!({"product_id": "prod-1", "quantity": 2}),
    )
    .await;
    assert_eq!(cart["item_count"], 3);
    assert_eq!(cart["subtotal"], "1000");

    let (status, order) = post_json(
        client,
        server.url("/api/checkout"),
        json!({"name": "Omar", "address": "5 Tahrir Sq, Cairo", "phone": "0122222222"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["total"], "1000");
    assert_eq!(order["items"].as_array().map(Vec::len), Some(2));

    let (_, count) = get_json(client, server.url("/api/cart/count")).await;
    assert_eq!(count["count"], 0);

    let (status, confirmation) =
        get_json(client, server.url("/api/order-confirmation")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmation["id"], order["id"]);
    assert_eq!(confirmation["customer"]["name"], "Omar");
}

#[tokio::test]
async fn test_checkout_rejects_empty_cart() {
    let server = TestServer::start(CatalogConfig::in_memory()).await;

    let (status, _) = post_json(
        &server.client,
        server.url("/api/checkout"),
        json!({"name": "Omar", "address": "5 Tahrir Sq", "phone": "0122222222"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get_json(&server.client, server.url("/api/order-confirmation")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_object());
}

#[tokio::test]
async fn test_unknown_product_is_a_json_error() {
    let server = TestServer::start(CatalogConfig::in_memory()).await;

    let (status, body) = get_json(&server.client, server.url("/api/products/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Not found: product nope"}));
}

#[tokio::test]
async fn test_deleted_product_stays_in_existing_carts() {
    let server = TestServer::start(CatalogConfig::in_memory()).await;
    post_json(
        &server.client,
        server.url("/api/cart/add"),
        json!({"product_id": "prod-3"}),
    )
    .await;

    let admin = browser();
    login_admin(&server, &admin).await;
    let resp = admin
        .delete(server.url("/api/admin/products/prod-3?confirm=true"))
        .send()
        .await
        .expect("DELETE failed");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (_, cart) = get_json(&server.client, server.url("/api/cart")).await;
    assert_eq!(ids(&cart["items"]), ["prod-3"]);
}

// ============================================================================
// Admin
// ============================================================================

#[tokio::test]
async fn test_admin_gate_is_per_session() {
    let server = TestServer::start(CatalogConfig::in_memory()).await;
    let admin = &server.client;
    let visitor = browser();

    let (status, _) = get_json(admin, server.url("/api/admin/products")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post_json(
        admin,
        server.url("/api/auth/login"),
        json!({"username": "admin", "password": "wrong"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Invalid credentials"}));

    login_admin(&server, admin).await;
    let (status, _) = get_json(admin, server.url("/api/admin/products")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get_json(&visitor, server.url("/api/admin/products")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    admin
        .post(server.url("/api/auth/logout"))
        .send()
        .await
        .expect("logout failed");
    let (status, _) = get_json(admin, server.url("/api/admin/products")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_edits_are_visible_to_shoppers() {
    let server = TestServer::start(CatalogConfig::in_memory()).await;
    let admin = &server.client;
    login_admin(&server, admin).await;
    let visitor = browser();

    let (status, created) = post_json(
        admin,
        server.url("/api/admin/products"),
        json!({
            "name": "Wool Scarf",
            "category": "women",
            "price": "180",
            "imageUrl": "data:image/png;base64,iVBORw0KGgo=",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let rating = created["rating"].as_str().expect("rating").to_owned();
    assert!(rating == "4" || rating == "5", "default rating was {rating}");
    let id = created["id"].as_str().expect("id").to_owned();

    let (_, women) =
        get_json(&visitor, server.url("/api/products?category=women&q=scarf")).await;
    assert_eq!(ids(&women["products"]), [id.clone()]);

    let resp = admin
        .patch(server.url(&format!("/api/admin/products/{id}")))
        .json(&json!({"price": "150", "originalPrice": "180"}))
        .send()
        .await
        .expect("PATCH failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let (_, detail) = get_json(&visitor, server.url(&format!("/api/products/{id}"))).await;
    assert_eq!(detail["discountPercent"], 17);

    let resp = admin
        .patch(server.url(&format!("/api/admin/products/{id}")))
        .json(&json!({"colour": "red"}))
        .send()
        .await
        .expect("PATCH failed");
    assert!(resp.status().is_client_error());

    let resp = admin
        .delete(server.url(&format!("/api/admin/products/{id}")))
        .send()
        .await
        .expect("DELETE failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(server.catalog.get(&souk_core::ProductId::new(id.as_str())).is_some());
}
