//! Seed the configured catalog backend.
//!
//! Runs the same initialization the storefront runs at startup: existing
//! products are left alone, an empty catalog is filled from the generator,
//! and the built-in list is used whenever generation fails.

use tracing::{info, warn};

use souk_storefront::catalog::{CatalogStore, InitOutcome};
use souk_storefront::config::{CatalogBackendKind, CatalogConfig, GeminiConfig, MAX_SEED_COUNT};
use souk_storefront::db::AnyCatalogBackend;
use souk_storefront::services::generator::{GeminiGenerator, ProductGenerator};

use super::CliError;

/// Seed the catalog from the environment's configuration.
///
/// # Arguments
///
/// * `count` - Number of products to request from the generator
/// * `fallback_only` - If true, skip the generator entirely
///
/// # Errors
///
/// Returns an error if configuration is invalid, `count` is out of range, or
/// the backend cannot be read.
pub async fn catalog(count: usize, fallback_only: bool) -> Result<InitOutcome, CliError> {
    // Load environment variables
    dotenvy::dotenv().ok();

    if count == 0 || count > MAX_SEED_COUNT {
        return Err(CliError::InvalidArgument(format!(
            "--count must be between 1 and {MAX_SEED_COUNT}"
        )));
    }

    let config = CatalogConfig::from_env()?;
    if config.backend == CatalogBackendKind::Memory {
        warn!("memory backend selected: seeded products are discarded when this command exits");
    }

    let generator = if fallback_only {
        None
    } else {
        match GeminiConfig::from_env().as_ref().map(GeminiGenerator::new).transpose() {
            Ok(generator) => generator,
            Err(e) => {
                warn!(error = %e, "Seed generator unavailable, using fallback catalog");
                None
            }
        }
    };

    seed_backend(&config, count, &generator).await
}

/// Initialize the backend described by `config`.
///
/// # Errors
///
/// Returns an error if the backend cannot be built or read.
pub async fn seed_backend<G: ProductGenerator>(
    config: &CatalogConfig,
    count: usize,
    generator: &G,
) -> Result<InitOutcome, CliError> {
    let backend = AnyCatalogBackend::from_config(config)?;
    info!(backend = backend.kind(), count, "Initializing catalog");

    let store = CatalogStore::new(backend, count);
    let outcome = store.initialize(generator).await?;
    info!(%outcome, "Catalog initialized");
    Ok(outcome)
}
