//! Monetary amounts in integer minor units.
//!
//! Payment providers send amounts as integer cents. Conversion to major units
//! is done with integer division and remainder so the value is exact; there is
//! no floating point anywhere on this path.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of minor units per major unit (cents per dollar).
const MINOR_PER_MAJOR: i64 = 100;

/// An amount of money as sent by the payment provider (`amount_money`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the smallest currency unit (e.g., cents).
    pub amount: i64,
    /// ISO 4217 currency code, when the provider includes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl Money {
    pub fn from_minor(amount: i64) -> Self {
        Self {
            amount,
            currency: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Amount in minor units.
    pub fn minor_units(&self) -> i64 {
        self.amount
    }

    /// Exact major-unit view of the amount.
    pub fn major_units(&self) -> MajorUnits {
        MajorUnits(self.amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.currency {
            Some(currency) => write!(f, "{} {}", self.major_units(), currency),
            None => write!(f, "{}", self.major_units()),
        }
    }
}

/// Fixed-point major-unit amount with two decimal places.
///
/// Displays as `25.50` for 2550 minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MajorUnits(i64);

impl MajorUnits {
    /// Whole major units, truncated toward zero.
    pub fn whole(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Fractional part in minor units, always non-negative.
    pub fn fraction(&self) -> u32 {
        (self.0 % MINOR_PER_MAJOR).unsigned_abs() as u32
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for MajorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `whole()` is 0 for amounts in (-100, 0), so the sign is written separately
        let sign = if self.is_negative() { "-" } else { "" };
        write!(
            f,
            "{}{}.{:02}",
            sign,
            self.whole().unsigned_abs(),
            self.fraction()
        )
    }
}
