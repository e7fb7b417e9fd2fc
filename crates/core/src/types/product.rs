//! Catalog products and the payloads used to create and edit them.
//!
//! Products are serialized with camelCase field names (`originalPrice`,
//! `imageUrl`) so that documents written by earlier versions of the store and
//! records returned by the seed generator share one wire shape.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize};

use super::{Category, ImageRef, Price, ProductId, Rating};

/// Errors raised when a product violates its invariants.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    /// The product name is blank.
    #[error("product name cannot be empty")]
    EmptyName,
    /// The original (pre-discount) price is lower than the selling price.
    #[error("original price {original} must not be below price {price}")]
    OriginalPriceBelowPrice {
        /// Selling price.
        price: Price,
        /// Original price.
        original: Price,
    },
}

/// A catalog product.
///
/// Invariants (checked on every construction path, including
/// deserialization): the name is not blank and `original_price`, when
/// present, is at least `price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ProductFields")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: Category,
    pub price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Price>,
    pub rating: Rating,
    pub image_url: ImageRef,
    pub description: String,
}

/// Unchecked mirror of [`Product`] used as the deserialization target.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductFields {
    id: ProductId,
    name: String,
    category: Category,
    price: Price,
    #[serde(default)]
    original_price: Option<Price>,
    rating: Rating,
    image_url: ImageRef,
    #[serde(default)]
    description: String,
}

impl TryFrom<ProductFields> for Product {
    type Error = ProductError;

    fn try_from(fields: ProductFields) -> Result<Self, Self::Error> {
        let product = Self {
            id: fields.id,
            name: fields.name,
            category: fields.category,
            price: fields.price,
            original_price: fields.original_price,
            rating: fields.rating,
            image_url: fields.image_url,
            description: fields.description,
        };
        product.validate()?;
        Ok(product)
    }
}

impl Product {
    /// Check the product invariants.
    ///
    /// # Errors
    ///
    /// Returns `ProductError` if the name is blank or the original price is
    /// below the selling price.
    pub fn validate(&self) -> Result<(), ProductError> {
        validate_fields(&self.name, self.price, self.original_price)
    }

    /// Discount shown on product cards, as a whole percentage.
    ///
    /// `None` when there is no original price or it is not above the price.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price?.amount();
        if original <= self.price.amount() || original.is_zero() {
            return None;
        }
        let ratio = (original - self.price.amount()) / original * Decimal::ONE_HUNDRED;
        ratio.round().to_u32()
    }
}

fn validate_fields(
    name: &str,
    price: Price,
    original_price: Option<Price>,
) -> Result<(), ProductError> {
    if name.trim().is_empty() {
        return Err(ProductError::EmptyName);
    }
    if let Some(original) = original_price
        && original < price
    {
        return Err(ProductError::OriginalPriceBelowPrice { price, original });
    }
    Ok(())
}

/// Data for a new product: everything but the identifier.
///
/// The rating is optional; the catalog assigns a default when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProduct {
    pub name: String,
    pub category: Category,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    pub image_url: ImageRef,
    #[serde(default)]
    pub description: String,
}

impl NewProduct {
    /// Check the invariants shared with [`Product`].
    ///
    /// # Errors
    ///
    /// Returns `ProductError` if the name is blank or the original price is
    /// below the selling price.
    pub fn validate(&self) -> Result<(), ProductError> {
        validate_fields(&self.name, self.price, self.original_price)
    }

    /// Attach an identifier, using `default_rating` when no rating was given.
    ///
    /// # Errors
    ///
    /// Returns `ProductError` if the data violates the product invariants.
    pub fn into_product(
        self,
        id: ProductId,
        default_rating: Rating,
    ) -> Result<Product, ProductError> {
        let product = Product {
            id,
            name: self.name.trim().to_owned(),
            category: self.category,
            price: self.price,
            original_price: self.original_price,
            rating: self.rating.unwrap_or(default_rating),
            image_url: self.image_url,
            description: self.description,
        };
        product.validate()?;
        Ok(product)
    }
}

impl From<Product> for NewProduct {
    fn from(product: Product) -> Self {
        Self {
            name: product.name,
            category: product.category,
            price: product.price,
            original_price: product.original_price,
            rating: Some(product.rating),
            image_url: product.image_url,
            description: product.description,
        }
    }
}

/// A typed partial update. Absent fields are left unchanged.
///
/// `original_price` distinguishes "absent" (`None`) from "clear the
/// discount" (`Some(None)`, sent as JSON `null`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_price: Option<Option<Price>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Maps a present field to `Some`, keeping a JSON `null` as `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProductUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.original_price.is_none()
            && self.rating.is_none()
            && self.image_url.is_none()
            && self.description.is_none()
    }

    /// Produce the updated product, re-checking invariants on the result.
    ///
    /// # Errors
    ///
    /// Returns `ProductError` if the merged product is invalid.
    pub fn apply(&self, product: &Product) -> Result<Product, ProductError> {
        let mut next = product.clone();
        if let Some(name) = &self.name {
            next.name = name.trim().to_owned();
        }
        if let Some(category) = self.category {
            next.category = category;
        }
        if let Some(price) = self.price {
            next.price = price;
        }
        if let Some(original_price) = self.original_price {
            next.original_price = original_price;
        }
        if let Some(rating) = self.rating {
            next.rating = rating;
        }
        if let Some(image_url) = &self.image_url {
            next.image_url = image_url.clone();
        }
        if let Some(description) = &self.description {
            next.description.clone_from(description);
        }
        next.validate()?;
        Ok(next)
    }
}
