//! Catalog inspection and maintenance.

use clap::Args;
use rust_decimal::Decimal;
use tracing::info;

use souk_core::{CategoryFilter, Price, Product};
use souk_storefront::catalog::{CatalogQuery, PriceRange, SortKey, derive_view};
use souk_storefront::config::CatalogConfig;
use souk_storefront::db::{AnyCatalogBackend, CatalogBackend};

use super::CliError;

/// Browse filters for `catalog list`.
#[derive(Debug, Default, Args)]
pub struct ListArgs {
    /// Category (`all`, `men`, `women`, `kids`)
    #[arg(long)]
    pub category: Option<String>,

    /// Lowest price, inclusive
    #[arg(long)]
    pub min_price: Option<Decimal>,

    /// Highest price, inclusive
    #[arg(long)]
    pub max_price: Option<Decimal>,

    /// Case-insensitive name search
    #[arg(short, long)]
    pub query: Option<String>,

    /// Sort key (`default`, `price-asc`, `price-desc`, `rating-desc`)
    #[arg(long)]
    pub sort: Option<String>,
}

impl ListArgs {
    /// Convert to a catalog query.
    ///
    /// # Errors
    ///
    /// Returns `CliError::InvalidArgument` for an unknown category or sort
    /// key or a negative price.
    pub fn to_query(&self) -> Result<CatalogQuery, CliError> {
        let invalid = |e: &dyn std::fmt::Display| CliError::InvalidArgument(e.to_string());

        let category = match self.category.as_deref() {
            Some(raw) => raw.parse::<CategoryFilter>().map_err(|e| invalid(&e))?,
            None => CategoryFilter::All,
        };
        let sort = match self.sort.as_deref() {
            Some(raw) => raw.parse::<SortKey>().map_err(|e| invalid(&e))?,
            None => SortKey::Default,
        };
        let min = self.min_price.map(Price::new).transpose().map_err(|e| invalid(&e))?;
        let max = self.max_price.map(Price::new).transpose().map_err(|e| invalid(&e))?;

        Ok(CatalogQuery {
            category,
            price: PriceRange::new(min, max),
            text: self.query.clone().unwrap_or_default(),
            sort,
        })
    }
}

/// Load the stored catalog and apply the browse query.
///
/// # Errors
///
/// Returns an error if the arguments are invalid or the backend cannot be read.
pub async fn query_backend(
    config: &CatalogConfig,
    args: &ListArgs,
) -> Result<Vec<Product>, CliError> {
    let query = args.to_query()?;
    let backend = AnyCatalogBackend::from_config(config)?;
    let products = backend.load().await?;
    Ok(derive_view(&products, &query))
}

/// Print products matching the browse query.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the backend cannot be read.
#[allow(clippy::print_stdout)]
pub async fn list(args: &ListArgs) -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let config = CatalogConfig::from_env()?;
    let products = query_backend(&config, args).await?;

    for product in &products {
        let discount = product
            .discount_percent()
            .map(|pct| format!(" (-{pct}%)"))
            .unwrap_or_default();
        println!(
            "{:<12} {:<28} {:<6} {:>12}{discount}  {}/5",
            product.id.as_str(),
            product.name,
            product.category.as_str(),
            product.price.display(),
            product.rating.value(),
        );
    }
    info!(count = products.len(), "Listed products");
    Ok(())
}

/// Clear the "already seeded" marker so the next start seeds an empty
/// catalog again.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the marker cannot be written.
pub async fn reset_seed_marker() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let config = CatalogConfig::from_env()?;
    reset_backend_marker(&config).await
}

/// Clear the marker on the backend described by `config`.
///
/// # Errors
///
/// Returns an error if the marker cannot be written.
pub async fn reset_backend_marker(config: &CatalogConfig) -> Result<(), CliError> {
    let backend = AnyCatalogBackend::from_config(config)?;
    backend.set_seeded(false).await?;
    info!(backend = backend.kind(), "Seed marker cleared");
    Ok(())
}
