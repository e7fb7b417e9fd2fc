//! The cart store.
//!
//! A cart is a list of line items persisted as one JSON array under the
//! `cart` key. Changes are visible immediately; the write that follows each
//! change is best-effort and only logged when it fails.

use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use souk_core::{CartItem, Price, Product, ProductId};
use tracing::{debug, instrument, warn};

use crate::db::{KeyValueStore, get_json, keys, set_json};
use crate::observe::{Listeners, Subscription};

/// A change to the cart, delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// A line was added or its quantity increased.
    Added { product_id: ProductId, quantity: u32 },
    /// A line's quantity was set.
    QuantityChanged { product_id: ProductId, quantity: u32 },
    /// A line was removed.
    Removed(ProductId),
    /// The cart was emptied.
    Cleared,
}

/// Line items for one shopper.
pub struct CartStore<K> {
    kv: K,
    items: RwLock<Vec<CartItem>>,
    listeners: Listeners<CartEvent>,
}

impl<K: KeyValueStore> CartStore<K> {
    /// An empty cart that persists to `kv`. Nothing is read.
    #[must_use]
    pub fn new(kv: K) -> Self {
        Self {
            kv,
            items: RwLock::new(Vec::new()),
            listeners: Listeners::new(),
        }
    }

    /// Restore the cart persisted in `kv`.
    ///
    /// Unreadable or corrupt data yields an empty cart.
    pub async fn load(kv: K) -> Self {
        let items = match get_json::<Vec<CartItem>, _>(&kv, keys::CART).await {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "discarding unreadable cart");
                Vec::new()
            }
        };
        debug!(lines = items.len(), "cart loaded");

        Self {
            kv,
            items: RwLock::new(items),
            listeners: Listeners::new(),
        }
    }

    fn items_mut(&self) -> RwLockWriteGuard<'_, Vec<CartItem>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the line items, in the order they were added.
    #[must_use]
    pub fn list(&self) -> Vec<CartItem> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .fold(0u32, |total, item| total.saturating_add(item.quantity))
    }

    /// Sum of price times quantity over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(CartItem::line_total)
            .sum()
    }

    /// Quantity of `product_id` in the cart, if present.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|item| item.product_id() == product_id)
            .map(|item| item.quantity)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Register a change listener. Dropping the subscription unregisters it.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe(
        &self,
        listener: impl Fn(&CartEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.listeners.subscribe(listener)
    }

    /// Add `quantity` of `product`, merging with an existing line.
    ///
    /// A zero quantity changes nothing.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: Product, quantity: u32) {
        let product_id = product.id.clone();
        let snapshot = {
            let mut items = self.items_mut();
            if let Some(line) = items.iter_mut().find(|i| i.product_id() == &product_id) {
                if quantity == 0 {
                    return;
                }
                line.quantity = line.quantity.saturating_add(quantity);
            } else {
                let Some(line) = CartItem::new(product, quantity) else {
                    return;
                };
                items.push(line);
            }
            items.clone()
        };

        self.persist(&snapshot).await;
        self.listeners.notify(&CartEvent::Added {
            product_id,
            quantity,
        });
    }

    /// Set a line's quantity; zero removes the line. Unknown ids are ignored.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, product_id: &ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id).await;
            return;
        }

        let snapshot = {
            let mut items = self.items_mut();
            let Some(line) = items.iter_mut().find(|i| i.product_id() == product_id) else {
                return;
            };
            line.quantity = quantity;
            items.clone()
        };

        self.persist(&snapshot).await;
        self.listeners.notify(&CartEvent::QuantityChanged {
            product_id: product_id.clone(),
            quantity,
        });
    }

    /// Remove a line.
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: &ProductId) {
        let snapshot = {
            let mut items = self.items_mut();
            let before = items.len();
            items.retain(|i| i.product_id() != product_id);
            if items.len() == before {
                return;
            }
            items.clone()
        };

        self.persist(&snapshot).await;
        self.listeners.notify(&CartEvent::Removed(product_id.clone()));
    }

    /// Empty the cart and delete its persisted copy.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        self.items_mut().clear();
        if let Err(e) = self.kv.remove(keys::CART).await {
            warn!(error = %e, "failed to clear persisted cart");
        }
        self.listeners.notify(&CartEvent::Cleared);
    }

    async fn persist(&self, items: &[CartItem]) {
        if let Err(e) = set_json(&self.kv, keys::CART, items).await {
            warn!(error = %e, "failed to persist cart");
        }
    }
}
