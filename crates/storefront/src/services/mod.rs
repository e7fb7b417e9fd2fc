//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Admin session gate (static credential check)
//! - `checkout` - Guest checkout and the order confirmation snapshot
//! - `generator` - Seed product generation

pub mod auth;
pub mod checkout;
pub mod generator;
