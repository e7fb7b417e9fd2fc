//! Admin product management.
//!
//! Every handler takes [`RequireAdmin`], so requests without the session's
//! admin flag are rejected with 401 before reaching the catalog.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use souk_core::{NewProduct, Product, ProductId, ProductUpdate};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

use super::products::ready_catalog;

/// Query parameters for deletion.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

/// Every product, in catalog order.
#[instrument(skip_all)]
pub async fn list(_: RequireAdmin, State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(ready_catalog(&state)?.list()))
}

/// Create a product.
#[instrument(skip_all)]
pub async fn create(
    _: RequireAdmin,
    State(state): State<AppState>,
    Json(new): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = ready_catalog(&state)?.create(new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product. The body's id must match the path.
#[instrument(skip(state, product))]
pub async fn replace(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(product): Json<Product>,
) -> Result<Json<Product>> {
    if product.id.as_str() != id {
        return Err(AppError::BadRequest(format!(
            "body id {} does not match path id {id}",
            product.id
        )));
    }

    if ready_catalog(&state)?.update(product.clone()).await? {
        Ok(Json(product))
    } else {
        Err(AppError::NotFound(format!("product {id}")))
    }
}

/// Apply a partial update.
#[instrument(skip(state, changes))]
pub async fn patch(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<ProductUpdate>,
) -> Result<Json<Product>> {
    let id = ProductId::new(id);
    ready_catalog(&state)?
        .patch(&id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Delete a product. Requires `?confirm=true`.
#[instrument(skip(state))]
pub async fn delete(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode> {
    if !params.confirm {
        return Err(AppError::BadRequest(
            "deletion must be confirmed with ?confirm=true".to_string(),
        ));
    }

    let id = ProductId::new(id);
    if ready_catalog(&state)?.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("product {id}")))
    }
}
