//! Filtered and sorted views of the catalog.
//!
//! [`derive_view`] is a pure function of the product list and a
//! [`CatalogQuery`]: identical inputs always give an identical output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use souk_core::{CategoryFilter, Price, Product};

/// Number of products shown on the home page.
pub const FEATURED_COUNT: usize = 4;

/// Sort order for a catalog view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    /// Catalog order.
    #[default]
    Default,
    /// Cheapest first.
    PriceAsc,
    /// Most expensive first.
    PriceDesc,
    /// Best rated first.
    RatingDesc,
}

impl SortKey {
    /// Every sort key.
    pub const ALL: [Self; 4] = [
        Self::Default,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::RatingDesc,
    ];

    /// Canonical wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::RatingDesc => "rating-desc",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognized sort key.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown sort key: {0}")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "default" | "menu_order" => Ok(Self::Default),
            "price-asc" | "price-ascending" | "price" => Ok(Self::PriceAsc),
            "price-desc" | "price-descending" => Ok(Self::PriceDesc),
            "rating-desc" | "rating-descending" | "rating" => Ok(Self::RatingDesc),
            _ => Err(UnknownSortKey(s.to_owned())),
        }
    }
}

impl Serialize for SortKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SortKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceRange {
    pub min: Price,
    pub max: Price,
}

impl Default for PriceRange {
    /// Zero to unbounded.
    fn default() -> Self {
        Self {
            min: Price::ZERO,
            max: Price::MAX,
        }
    }
}

impl PriceRange {
    /// A range from optional bounds; missing bounds are open.
    #[must_use]
    pub fn new(min: Option<Price>, max: Option<Price>) -> Self {
        Self {
            min: min.unwrap_or(Price::ZERO),
            max: max.unwrap_or(Price::MAX),
        }
    }

    /// Whether `price` lies within the bounds.
    #[must_use]
    pub fn contains(&self, price: Price) -> bool {
        self.min <= price && price <= self.max
    }
}

/// Browse parameters: category, price range, name search and sort order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CatalogQuery {
    pub category: CategoryFilter,
    pub price: PriceRange,
    pub text: String,
    pub sort: SortKey,
}

impl CatalogQuery {
    /// Whether `product` passes every filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.category.matches(product.category)
            && self.price.contains(product.price)
            && name_matches(&product.name, &self.text)
    }
}

/// Case-insensitive substring match of the needle as given. A blank needle
/// matches everything.
fn name_matches(name: &str, needle: &str) -> bool {
    needle.trim().is_empty() || name.to_lowercase().contains(&needle.to_lowercase())
}

/// Filter and sort `products` according to `query`.
///
/// Sorting is stable: products with equal keys keep their catalog order.
#[must_use]
pub fn derive_view(products: &[Product], query: &CatalogQuery) -> Vec<Product> {
    let mut view: Vec<Product> = products
        .iter()
        .filter(|p| query.matches(p))
        .cloned()
        .collect();

    match query.sort {
        SortKey::Default => {}
        SortKey::PriceAsc => view.sort_by(|a, b| a.price.cmp(&b.price)),
        SortKey::PriceDesc => view.sort_by(|a, b| b.price.cmp(&a.price)),
        SortKey::RatingDesc => view.sort_by(|a, b| b.rating.cmp(&a.rating)),
    }
    view
}

/// The first `count` products in catalog order.
#[must_use]
pub fn featured(products: &[Product], count: usize) -> Vec<Product> {
    products.iter().take(count).cloned().collect()
}
