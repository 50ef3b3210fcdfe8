//! Monetary amounts using decimal arithmetic.
//!
//! Catalog prices, coupon amounts and order totals are all `Decimal` values in
//! the currency's standard unit (dollars, not cents). The payment provider
//! wants integer minor units, which [`Price::to_minor_units`] produces.

use core::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors produced when converting prices.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),
    #[error("amount is too large to charge: {0}")]
    Overflow(Decimal),
    #[error("unsupported currency: {0}")]
    UnknownCurrency(String),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Amount in minor units (cents), rounded half away from zero.
    ///
    /// ```
    /// use myshop_core::{CurrencyCode, Price};
    /// use rust_decimal::Decimal;
    ///
    /// let price = Price::new(Decimal::new(1999, 2), CurrencyCode::USD);
    /// assert_eq!(price.to_minor_units(), Ok(1999));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for negative amounts and
    /// `PriceError::Overflow` if the result does not fit in an `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative(self.amount));
        }
        let cents = (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        cents.to_i64().ok_or(PriceError::Overflow(self.amount))
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Lowercase code as the payment provider expects it.
    #[must_use]
    pub const fn as_provider_str(self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(PriceError::UnknownCurrency(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(units: i64, scale: u32) -> Price {
        Price::new(Decimal::new(units, scale), CurrencyCode::USD)
    }

    #[test]
    fn test_minor_units_exact() {
        assert_eq!(usd(12300, 2).to_minor_units(), Ok(12300));
        assert_eq!(usd(123, 0).to_minor_units(), Ok(12300));
        assert_eq!(usd(0, 0).to_minor_units(), Ok(0));
    }

    #[test]
    fn test_minor_units_rounds_half_up() {
        assert_eq!(usd(10005, 3).to_minor_units(), Ok(1001));
        assert_eq!(usd(10004, 3).to_minor_units(), Ok(1000));
    }

    #[test]
    fn test_minor_units_rejects_negative() {
        assert!(matches!(
            usd(-1, 2).to_minor_units(),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(usd(5, 0).display(), "$5.00");
        assert_eq!(
            Price::new(Decimal::new(1250, 2), CurrencyCode::EUR).to_string(),
            "€12.50"
        );
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("usd".parse::<CurrencyCode>(), Ok(CurrencyCode::USD));
        assert_eq!(CurrencyCode::GBP.as_provider_str(), "gbp");
        assert!("xyz".parse::<CurrencyCode>().is_err());
    }
}
