//! Checkout and order confirmation.

use axum::{Json, http::StatusCode};
use souk_core::{CustomerDetails, OrderSnapshot};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::SessionKv;
use crate::services::checkout::{last_order, place_order, remember_order};

use super::cart::session_cart;

/// Place a cash-on-delivery order for the session's cart.
#[instrument(skip_all)]
pub async fn place(
    session: Session,
    Json(details): Json<CustomerDetails>,
) -> Result<(StatusCode, Json<OrderSnapshot>)> {
    let cart = session_cart(session.clone()).await;
    let order = place_order(&cart, &details).await?;
    remember_order(&SessionKv::new(session), &order).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// The order placed most recently in this session.
#[instrument(skip_all)]
pub async fn confirmation(session: Session) -> Result<Json<OrderSnapshot>> {
    last_order(&SessionKv::new(session))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no recent order".to_string()))
}
