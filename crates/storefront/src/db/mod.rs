//! Persistence backends for the storefront.
//!
//! Two storage shapes are supported, mirroring what the store can run against:
//!
//! - **Key-value** ([`KeyValueStore`]): JSON strings addressed by key. Used for
//!   the cart snapshot, the admin session flag, the last order, the seed marker
//!   and (in the local variant) the whole catalog.
//! - **Document collections** ([`DocumentStore`]): JSON documents addressed by
//!   collection and id, with a change feed that pushes full snapshots.
//!
//! The catalog talks to either through [`CatalogBackend`].
//!
//! # Keys
//!
//! | Key                      | Scope            | Contents                 |
//! |--------------------------|------------------|--------------------------|
//! | `products`               | local catalog    | `Vec<Product>`           |
//! | `catalog_seeded`         | catalog          | `true` once seeded       |
//! | `cart`                   | browser session  | `Vec<CartItem>`          |
//! | `is_admin_authenticated` | browser session  | `true` while logged in   |
//! | `last_order`             | browser session  | `OrderSnapshot`          |

pub mod catalog;
pub mod documents;
pub mod http;
pub mod kv;

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use catalog::{AnyCatalogBackend, CatalogBackend, DocumentCatalog, KvCatalog};
pub use documents::{Document, DocumentStore, MemoryDocumentStore};
pub use http::HttpDocumentStore;
pub use kv::{FileKv, MemoryKv};

/// Well-known persistence keys.
pub mod keys {
    /// Local catalog snapshot.
    pub const PRODUCTS: &str = "products";

    /// Set once the catalog has been seeded.
    pub const CATALOG_SEEDED: &str = "catalog_seeded";

    /// Cart snapshot for the current browser.
    pub const CART: &str = "cart";

    /// Admin gate flag for the current browsing session.
    pub const ADMIN_AUTHENTICATED: &str = "is_admin_authenticated";

    /// Most recent order, shown on the confirmation view.
    pub const LAST_ORDER: &str = "last_order";
}

/// Errors that can occur reading or writing a persistence backend.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request to the remote document store failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote document store answered with an error status.
    #[error("remote store error ({status}): {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The session backing a key-value store could not be read or written.
    #[error("session error: {0}")]
    Session(String),

    /// Stored data is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The addressed document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A key contains characters the backend cannot address.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// A string key-value store (the shape of browser local/session storage).
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str)
    -> impl Future<Output = Result<Option<String>, PersistenceError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String)
    -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Read and decode a JSON value.
///
/// # Errors
///
/// Returns `PersistenceError::DataCorruption` if the stored value does not
/// decode as `T`, or the backend's error if the read fails.
pub async fn get_json<T, K>(kv: &K, key: &str) -> Result<Option<T>, PersistenceError>
where
    T: DeserializeOwned,
    K: KeyValueStore + ?Sized,
{
    match kv.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| PersistenceError::DataCorruption(format!("{key}: {e}"))),
        None => Ok(None),
    }
}

/// Encode and store a JSON value.
///
/// # Errors
///
/// Returns an error if encoding or the backend write fails.
pub async fn set_json<T, K>(kv: &K, key: &str, value: &T) -> Result<(), PersistenceError>
where
    T: Serialize + Sync + ?Sized,
    K: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    kv.set(key, raw).await
}
