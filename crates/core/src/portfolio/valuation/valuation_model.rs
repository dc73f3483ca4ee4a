//! Unrealized valuation models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Last unrealized value computed for one (ticker, currency).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnrealizedMark {
    pub ticker: String,
    pub currency: String,
    pub unrealized: Decimal,
    /// Day the value was last recomputed from a price. `None` until the first
    /// successful lookup.
    pub priced_on: Option<NaiveDate>,
}

impl UnrealizedMark {
    pub fn unpriced(ticker: &str, currency: &str) -> Self {
        UnrealizedMark {
            ticker: ticker.to_string(),
            currency: currency.to_string(),
            unrealized: Decimal::ZERO,
            priced_on: None,
        }
    }
}
