//! Cart line items.

use serde::{Deserialize, Serialize};

use super::{Price, Product, ProductId};

/// A product captured into the cart together with a positive quantity.
///
/// On the wire the product fields are flattened next to `quantity`, so a
/// persisted cart is a plain array of product records with a quantity each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CartItemFields")]
pub struct CartItem {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
}

#[derive(Deserialize)]
struct CartItemFields {
    #[serde(flatten)]
    product: Product,
    quantity: u32,
}

impl TryFrom<CartItemFields> for CartItem {
    type Error = &'static str;

    fn try_from(fields: CartItemFields) -> Result<Self, Self::Error> {
        Self::new(fields.product, fields.quantity).ok_or("cart quantity must be positive")
    }
}

impl CartItem {
    /// Create a line item. Returns `None` for a zero quantity.
    #[must_use]
    pub fn new(product: Product, quantity: u32) -> Option<Self> {
        if quantity == 0 {
            return None;
        }
        Some(Self { product, quantity })
    }

    /// The originating product's identifier.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price * self.quantity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{Category, ImageRef, Rating};

    fn tee() -> Product {
        Product {
            id: ProductId::new("prod-1"),
            name: "Classic Tee".to_owned(),
            category: Category::Men,
            price: Price::from_units(250),
            original_price: None,
            rating: Rating::stars(4),
            image_url: ImageRef::parse("https://picsum.photos/seed/prod1/600/900").unwrap(),
            description: String::new(),
        }
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert!(CartItem::new(tee(), 0).is_none());
    }

    #[test]
    fn test_line_total() {
        let item = CartItem::new(tee(), 3).unwrap();
        assert_eq!(item.line_total(), Price::from_units(750));
    }

    #[test]
    fn test_flattened_wire_shape() {
        let item = CartItem::new(tee(), 2).unwrap();
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["id"], "prod-1");
        assert_eq!(value["quantity"], 2);

        let back: CartItem = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(back, item);

        let mut zero = value;
        zero["quantity"] = serde_json::json!(0);
        assert!(serde_json::from_value::<CartItem>(zero).is_err());
    }
}
