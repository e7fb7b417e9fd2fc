//! Seed catalog generation.
//!
//! A [`ProductGenerator`] produces sample products for an empty catalog. The
//! production implementation calls the Generative Language API
//! ([`GeminiGenerator`]); generation is unreliable by nature, so the catalog
//! falls back to a fixed list when it fails.

mod error;
mod gemini;

use std::future::Future;

pub use error::{ApiError, ApiErrorResponse, GeneratorError};
pub use gemini::GeminiGenerator;

use souk_core::Product;

/// Produces sample catalog products.
pub trait ProductGenerator: Send + Sync {
    /// Generate up to `count` products.
    fn generate(
        &self,
        count: usize,
    ) -> impl Future<Output = Result<Vec<Product>, GeneratorError>> + Send;
}

/// An absent generator always reports `NotConfigured`.
impl<G: ProductGenerator> ProductGenerator for Option<G> {
    async fn generate(&self, count: usize) -> Result<Vec<Product>, GeneratorError> {
        match self {
            Some(generator) => generator.generate(count).await,
            None => Err(GeneratorError::NotConfigured),
        }
    }
}

impl<G: ProductGenerator> ProductGenerator for &G {
    async fn generate(&self, count: usize) -> Result<Vec<Product>, GeneratorError> {
        (**self).generate(count).await
    }
}
