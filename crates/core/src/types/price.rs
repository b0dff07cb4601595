//! Item prices in integer minor currency units.
//!
//! Prices travel to and from the backend as non-negative integer cents. Form
//! input is decimal USD and is converted with `rust_decimal` so that values
//! like `19.99` never pass through binary floating point.

use core::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a decimal price.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input string is empty.
    #[error("price is required")]
    Empty,
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The input is negative.
    #[error("price cannot be negative")]
    Negative,
    /// The input does not fit in the cents range.
    #[error("price is too large")]
    TooLarge,
}

/// A price in US cents.
///
/// ## Examples
///
/// ```
/// use atelier_core::PriceCents;
///
/// let price = PriceCents::parse_usd("12.5").unwrap();
/// assert_eq!(price.cents(), 1250);
/// assert_eq!(price.to_string(), "$12.50");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PriceCents(u64);

impl PriceCents {
    /// Create a price from a cent amount.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Get the amount in cents.
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Parse a decimal USD amount (e.g. `"19.99"`) into cents.
    ///
    /// The amount is multiplied by 100 and rounded half away from zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not a number, negative or
    /// out of range.
    pub fn parse_usd(input: &str) -> Result<Self, PriceError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }

        let dollars: Decimal = trimmed.parse().map_err(|_| PriceError::NotANumber)?;
        if dollars.is_sign_negative() && !dollars.is_zero() {
            return Err(PriceError::Negative);
        }

        let cents = dollars
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(PriceError::TooLarge)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        cents.to_u64().map(Self).ok_or(PriceError::TooLarge)
    }

    /// Render the amount as a plain decimal string (e.g. `"19.99"`).
    ///
    /// Used to prefill price inputs.
    #[must_use]
    pub fn as_decimal_string(self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl fmt::Display for PriceCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.as_decimal_string())
    }
}

impl From<u64> for PriceCents {
    fn from(cents: u64) -> Self {
        Self(cents)
    }
}
