//! Guest checkout.
//!
//! Orders are cash-on-delivery: placing one captures the cart into an
//! [`OrderSnapshot`], empties the cart, and keeps the snapshot in the session
//! for the confirmation view. Nothing else is recorded.

use souk_core::{CustomerDetails, OrderSnapshot};
use thiserror::Error;
use tracing::{info, instrument};

use crate::cart::CartStore;
use crate::db::{KeyValueStore, PersistenceError, get_json, keys, set_json};

/// Errors that can occur placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no items.
    #[error("cart is empty")]
    EmptyCart,

    /// A required customer field is blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Turn the cart into an order and empty it.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` if there is nothing to order and
/// `CheckoutError::MissingField` if a customer field is blank. The cart is
/// left untouched on error.
#[instrument(skip_all)]
pub async fn place_order<K: KeyValueStore>(
    cart: &CartStore<K>,
    customer: &CustomerDetails,
) -> Result<OrderSnapshot, CheckoutError> {
    if let Some(field) = customer.missing_field() {
        return Err(CheckoutError::MissingField(field));
    }
    let items = cart.list();
    if items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let order = OrderSnapshot::capture(customer.trimmed(), items);
    cart.clear().await;

    info!(
        order_id = %order.id,
        lines = order.items.len(),
        units = order.unit_count(),
        total = %order.total.display(),
        "order placed"
    );
    Ok(order)
}

/// Keep `order` for the confirmation view.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn remember_order<K: KeyValueStore>(
    session: &K,
    order: &OrderSnapshot,
) -> Result<(), PersistenceError> {
    set_json(session, keys::LAST_ORDER, order).await
}

/// The most recently placed order in this session.
///
/// # Errors
///
/// Returns an error if the session cannot be read or the stored order is
/// corrupt.
pub async fn last_order<K: KeyValueStore>(
    session: &K,
) -> Result<Option<OrderSnapshot>, PersistenceError> {
    get_json(session, keys::LAST_ORDER).await
}
