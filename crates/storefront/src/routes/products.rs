//! Product browsing route handlers.
//!
//! Listing applies the catalog view derivation to the current catalog: a
//! category filter, an inclusive price range, a name search and a sort key,
//! all taken from the query string.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use souk_core::{Category, CategoryFilter, Price, Product, ProductId};
use tracing::instrument;

use crate::catalog::{
    CatalogQuery, FEATURED_COUNT, InitPhase, PriceRange, SortKey, derive_view, featured,
};
use crate::error::{AppError, Result};
use crate::state::{AppState, Catalog};

// =============================================================================
// Query Parameters
// =============================================================================

/// Query parameters for the product listing.
///
/// Values arrive as strings and are parsed by hand so that a bad value names
/// the offending parameter in a 400 response.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
}

impl ProductListParams {
    /// Parse into a catalog query.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first invalid parameter.
    pub fn into_query(self) -> Result<CatalogQuery> {
        let category = self
            .category
            .as_deref()
            .map_or(Ok(CategoryFilter::All), str::parse)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let min = parse_price("min_price", self.min_price.as_deref())?;
        let max = parse_price("max_price", self.max_price.as_deref())?;
        let sort = self
            .sort
            .as_deref()
            .map_or(Ok(SortKey::Default), str::parse)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        Ok(CatalogQuery {
            category,
            price: PriceRange::new(min, max),
            text: self.q.unwrap_or_default(),
            sort,
        })
    }
}

/// Parse an optional price bound. Blank values count as absent.
fn parse_price(name: &str, raw: Option<&str>) -> Result<Option<Price>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<Decimal>()
        .ok()
        .and_then(|amount| Price::new(amount).ok())
        .map(Some)
        .ok_or_else(|| AppError::BadRequest(format!("{name} must be a non-negative number")))
}

// =============================================================================
// Response Types
// =============================================================================

/// A filtered product listing.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub count: usize,
    pub category: CategoryFilter,
    pub sort: SortKey,
}

/// A single product with its derived display fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub discount_percent: Option<u32>,
    pub price_display: String,
    pub full_stars: u8,
}

impl From<Product> for ProductDetail {
    fn from(product: Product) -> Self {
        Self {
            discount_percent: product.discount_percent(),
            price_display: product.price.display(),
            full_stars: product.rating.full_stars(),
            product,
        }
    }
}

/// Catalog reads are only served once initialization has finished.
pub(crate) fn ready_catalog(state: &AppState) -> Result<&Catalog> {
    let catalog = state.catalog();
    if catalog.phase() == InitPhase::Ready {
        Ok(catalog)
    } else {
        Err(AppError::NotReady)
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// List the browsable categories, `all` first.
pub async fn categories() -> Json<Vec<CategoryFilter>> {
    let all = std::iter::once(CategoryFilter::All)
        .chain(Category::ALL.into_iter().map(CategoryFilter::Only))
        .collect();
    Json(all)
}

/// Filtered, sorted product listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<Json<ProductListResponse>> {
    let query = params.into_query()?;
    let products = derive_view(&ready_catalog(&state)?.list(), &query);

    Ok(Json(ProductListResponse {
        count: products.len(),
        products,
        category: query.category,
        sort: query.sort,
    }))
}

/// Products shown on the home page.
#[instrument(skip(state))]
pub async fn featured_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let catalog = ready_catalog(&state)?;
    Ok(Json(featured(&catalog.list(), FEATURED_COUNT)))
}

/// Product detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductDetail>> {
    let id = ProductId::new(id);
    ready_catalog(&state)?
        .get(&id)
        .map(|product| Json(ProductDetail::from(product)))
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_params_default_to_everything() {
        let query = ProductListParams::default().into_query().unwrap();
        assert_eq!(query, CatalogQuery::default());
    }

    #[test]
    fn test_params_parse_all_fields() {
        let params = ProductListParams {
            category: Some("Women".to_owned()),
            min_price: Some("100".to_owned()),
            max_price: Some(" ".to_owned()),
            q: Some("dress".to_owned()),
            sort: Some("price".to_owned()),
        };
        let query = params.into_query().unwrap();

        assert_eq!(query.category, CategoryFilter::Only(Category::Women));
        assert_eq!(query.price, PriceRange::new(Some(Price::from_units(100)), None));
        assert_eq!(query.text, "dress");
        assert_eq!(query.sort, SortKey::PriceAsc);
    }

    #[test]
    fn test_params_reject_bad_values() {
        let bad_price = ProductListParams {
            min_price: Some("-5".to_owned()),
            ..Default::default()
        };
        assert!(matches!(
            bad_price.into_query(),
            Err(AppError::BadRequest(msg)) if msg.contains("min_price")
        ));

        let bad_category = ProductListParams {
            category: Some("pets".to_owned()),
            ..Default::default()
        };
        assert!(matches!(bad_category.into_query(), Err(AppError::BadRequest(_))));

        let bad_sort = ProductListParams {
            sort: Some("newest".to_owned()),
            ..Default::default()
        };
        assert!(matches!(bad_sort.into_query(), Err(AppError::BadRequest(_))));
    }
}
