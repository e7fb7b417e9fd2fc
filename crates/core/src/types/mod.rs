//! Core types for Souk.
//!
//! This module provides type-safe wrappers for the storefront domain.

pub mod cart;
pub mod category;
pub mod id;
pub mod image;
pub mod order;
pub mod price;
pub mod product;
pub mod rating;

pub use cart::CartItem;
pub use category::{Category, CategoryFilter, UnknownCategory};
pub use id::*;
pub use image::{ImageError, ImageRef};
pub use order::{CustomerDetails, OrderSnapshot};
pub use price::{CurrencyCode, Price, PriceError};
pub use product::{NewProduct, Product, ProductError, ProductUpdate};
pub use rating::{Rating, RatingError};
