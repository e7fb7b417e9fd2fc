//! CLI command implementations.

pub mod catalog;
pub mod seed;

use thiserror::Error;

use souk_storefront::catalog::CatalogError;
use souk_storefront::config::ConfigError;
use souk_storefront::db::PersistenceError;

/// Errors that can occur running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Storage read or write failed.
    #[error("Storage error: {0}")]
    Persistence(#[from] PersistenceError),

    /// A command-line argument is invalid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
