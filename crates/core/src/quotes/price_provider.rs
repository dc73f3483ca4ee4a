//! Current-price lookup used to mark open legs to market.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::errors::Result;

/// Best-effort price lookup supplied by the host.
///
/// `Ok(None)` means no price is known, which is a normal outcome: callers keep
/// the previously computed unrealized values instead of zeroing them.
pub trait PriceProviderTrait: Send + Sync {
    /// Latest price for a ticker (or option contract symbol) quoted in `currency`.
    fn fetch_current_price(&self, ticker: &str, currency: &str) -> Result<Option<Decimal>>;
}

/// Provider that never knows a price.
#[derive(Clone, Default)]
pub struct NoPriceProvider;

impl PriceProviderTrait for NoPriceProvider {
    fn fetch_current_price(&self, _ticker: &str, _currency: &str) -> Result<Option<Decimal>> {
        Ok(None)
    }
}

/// Pre-fetched price table keyed by (ticker, currency).
#[derive(Clone, Default, Debug)]
pub struct StaticPriceProvider {
    prices: HashMap<(String, String), Decimal>,
}

impl StaticPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, ticker: &str, currency: &str, price: Decimal) -> Self {
        self.insert(ticker, currency, price);
        self
    }

    pub fn insert(&mut self, ticker: &str, currency: &str, price: Decimal) {
        self.prices
            .insert((ticker.to_string(), currency.to_string()), price);
    }
}

impl PriceProviderTrait for StaticPriceProvider {
    fn fetch_current_price(&self, ticker: &str, currency: &str) -> Result<Option<Decimal>> {
        Ok(self
            .prices
            .get(&(ticker.to_string(), currency.to_string()))
            .copied())
    }
}
