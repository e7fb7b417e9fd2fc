//! Souk Core - Shared domain types.
//!
//! This crate provides the types used across all Souk components:
//! - `storefront` - Catalog, cart, checkout and admin HTTP service
//! - `cli` - Command-line tools for seeding and inspecting the catalog
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no persistence,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Products, categories, prices, ratings, cart lines and orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
