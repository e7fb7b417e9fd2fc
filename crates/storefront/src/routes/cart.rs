//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Each request loads it through
//! [`SessionKv`], applies one change, and the cart store writes the result
//! back before the response is built.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use souk_core::{CartItem, Price, ProductId};
use tower_sessions::Session;
use tracing::instrument;

use crate::cart::CartStore;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::SessionKv;
use crate::state::AppState;

use super::products::ready_catalog;

/// Cart contents with totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub item_count: u32,
    pub subtotal: Price,
    pub subtotal_display: String,
}

impl<K: crate::db::KeyValueStore> From<&CartStore<K>> for CartView {
    fn from(cart: &CartStore<K>) -> Self {
        let subtotal = cart.subtotal();
        Self {
            items: cart.list(),
            item_count: cart.item_count(),
            subtotal,
            subtotal_display: subtotal.display(),
        }
    }
}

/// Badge count.
#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: u32,
}

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Update cart line form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: u32,
}

/// Remove cart line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Load the session's cart.
pub(crate) async fn session_cart(session: Session) -> CartStore<SessionKv> {
    CartStore::load(SessionKv::new(session)).await
}

/// Show the cart.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Json<CartView> {
    let cart = session_cart(session).await;
    Json(CartView::from(&cart))
}

/// Total number of units in the cart.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Json<CartCount> {
    let cart = session_cart(session).await;
    Json(CartCount {
        count: cart.item_count(),
    })
}

/// Add a catalog product to the cart.
///
/// The product is copied from the catalog at the time of adding.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<AddToCartForm>,
) -> Result<Json<CartView>> {
    let id = ProductId::new(form.product_id);
    let product = ready_catalog(&state)?
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let cart = session_cart(session).await;
    cart.add(product, form.quantity).await;
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", id.as_str())]),
    );

    Ok(Json(CartView::from(&cart)))
}

/// Change a line's quantity; zero removes the line.
#[instrument(skip(session))]
pub async fn update(session: Session, Json(form): Json<UpdateCartForm>) -> Json<CartView> {
    let cart = session_cart(session).await;
    cart.set_quantity(&ProductId::new(form.product_id), form.quantity)
        .await;
    Json(CartView::from(&cart))
}

/// Remove a line.
#[instrument(skip(session))]
pub async fn remove(session: Session, Json(form): Json<RemoveFromCartForm>) -> Json<CartView> {
    let cart = session_cart(session).await;
    cart.remove(&ProductId::new(form.product_id)).await;
    Json(CartView::from(&cart))
}
