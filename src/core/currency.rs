//! Local-currency to canonical-unit conversion.
//!
//! Division runs in `rust_decimal`; the result becomes an `f64` only at the end.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{RelayError, Result};

/// Default local-currency units per canonical unit (CNY per USD).
pub const DEFAULT_EXCHANGE_RATE: f64 = 7.3;

/// Units of local currency per canonical unit. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    /// Build from a configured rate.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if the rate is not a finite positive number.
    pub fn new(rate: f64) -> Result<Self> {
        let value = Decimal::try_from(rate)
            .map_err(|_| RelayError::Config(format!("invalid exchange rate: {rate}")))?;
        if value <= Decimal::ZERO {
            return Err(RelayError::Config(format!(
                "exchange rate must be positive, got {rate}"
            )));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn as_decimal(self) -> Decimal {
        self.0
    }

    /// Convert a local-currency amount into the canonical unit.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Decode`] if the amount is not representable.
    pub fn to_canonical(self, local: f64) -> Result<f64> {
        let amount = Decimal::try_from(local)
            .map_err(|e| RelayError::decode("local currency amount", e))?;
        amount
            .checked_div(self.0)
            .and_then(|v| v.to_f64())
            .ok_or_else(|| RelayError::decode("local currency amount", "conversion overflow"))
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self(Decimal::new(73, 1))
    }
}
