//! Product rating on a 0-5 scale.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    /// The value lies outside `0..=5`.
    #[error("rating must be between 0 and 5 (got {0})")]
    OutOfRange(Decimal),
}

/// A rating between 0 and 5 inclusive. Fractional values are allowed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rating(Decimal);

impl Rating {
    /// Highest possible rating.
    pub const MAX: Self = Self(Decimal::from_parts(5, 0, 0, false, 0));

    /// Create a rating, rejecting values outside `0..=5`.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::OutOfRange` for values below 0 or above 5.
    pub fn new(value: Decimal) -> Result<Self, RatingError> {
        if value < Decimal::ZERO || value > Self::MAX.0 {
            return Err(RatingError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Create a rating from whole stars, clamped to 5.
    #[must_use]
    pub fn stars(stars: u8) -> Self {
        Self(Decimal::from(stars.min(5)))
    }

    /// The underlying value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Number of fully filled stars when rendering.
    #[must_use]
    pub fn full_stars(&self) -> u8 {
        // Bounded to 0..=5 by construction.
        self.0.floor().to_u8().unwrap_or(0)
    }
}

impl TryFrom<Decimal> for Rating {
    type Error = RatingError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for Decimal {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
