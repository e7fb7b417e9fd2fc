//! Checkout order snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CartItem, OrderId, Price};

/// Contact details collected by the checkout form. All fields are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl CustomerDetails {
    /// The first required field that is blank, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("address", &self.address),
            ("phone", &self.phone),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }

    /// Copy with surrounding whitespace removed from every field.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            address: self.address.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
        }
    }
}

/// What was ordered, by whom, and for how much, captured at checkout time.
///
/// Orders are cash-on-delivery and are not persisted beyond the confirmation
/// view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub customer: CustomerDetails,
    pub items: Vec<CartItem>,
    pub total: Price,
    pub placed_at: DateTime<Utc>,
}

impl OrderSnapshot {
    /// Capture an order from cart lines, computing the total.
    #[must_use]
    pub fn capture(customer: CustomerDetails, items: Vec<CartItem>) -> Self {
        let total = items.iter().map(CartItem::line_total).sum();
        Self {
            id: OrderId::generate(),
            customer,
            items,
            total,
            placed_at: Utc::now(),
        }
    }

    /// Total number of units ordered.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}
