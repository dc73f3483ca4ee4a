use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::valuation_model::UnrealizedMark;
use crate::portfolio::ledger::{position_key, OptionLeg, Position, PositionLedger};
use crate::quotes::PriceProviderTrait;

/// Market value of the shares minus their cost basis.
pub fn mark_position(position: &Position, price: Decimal) -> Decimal {
    position.quantity * price - position.total_cost_basis
}

/// Value of the open contracts at `price` per share plus the net premium
/// already booked for them. Short legs carry a negative quantity.
pub fn mark_option_leg(leg: &OptionLeg, price: Decimal) -> Decimal {
    price * leg.quantity * leg.contract.multiplier + leg.open_premium
}

/// Looks up a price, treating provider failures like a missing price.
fn lookup(prices: &dyn PriceProviderTrait, symbol: &str, currency: &str) -> Option<Decimal> {
    match prices.fetch_current_price(symbol, currency) {
        Ok(price) => {
            if price.is_none() {
                debug!("No current price for {} in {}", symbol, currency);
            }
            price
        }
        Err(e) => {
            warn!(
                "Price lookup for {} in {} failed, keeping previous value: {}",
                symbol, currency, e
            );
            None
        }
    }
}

/// Carry-forward store of unrealized values per (ticker, currency).
///
/// A ticker is only recomputed when every open leg on it has a price. Otherwise
/// the previous value stays, so a missing quote never drops unrealized to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnrealizedTracker {
    marks: BTreeMap<String, UnrealizedMark>,
}

impl UnrealizedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revalues one ticker against the ledger and returns its unrealized value.
    pub fn revalue(
        &mut self,
        ledger: &PositionLedger,
        ticker: &str,
        currency: &str,
        prices: &dyn PriceProviderTrait,
        day: NaiveDate,
    ) -> Decimal {
        let key = position_key(ticker, currency);

        if !ledger.has_open_legs_for(ticker, currency) {
            self.marks.remove(&key);
            return Decimal::ZERO;
        }

        let mut total = Decimal::ZERO;
        let mut complete = true;

        if let Some(position) = ledger.position(ticker, currency).filter(|p| p.is_open()) {
            match lookup(prices, ticker, currency) {
                Some(price) => total += mark_position(position, price),
                None => complete = false,
            }
        }
        for leg in ledger.option_legs_for(ticker, currency) {
            if !complete {
                break;
            }
            match lookup(prices, &leg.symbol, currency) {
                Some(price) => total += mark_option_leg(leg, price),
                None => complete = false,
            }
        }

        let mark = self
            .marks
            .entry(key)
            .or_insert_with(|| UnrealizedMark::unpriced(ticker, currency));
        if complete {
            mark.unrealized = total;
            mark.priced_on = Some(day);
        } else {
            debug!(
                "Carrying unrealized {} for {} in {} forward from {:?}",
                mark.unrealized, ticker, currency, mark.priced_on
            );
        }
        mark.unrealized
    }

    /// Revalues every ticker that is open in the ledger or still holds a mark.
    pub fn revalue_all(
        &mut self,
        ledger: &PositionLedger,
        prices: &dyn PriceProviderTrait,
        day: NaiveDate,
    ) {
        let mut tickers = ledger.open_tickers();
        tickers.extend(
            self.marks
                .values()
                .map(|m| (m.ticker.clone(), m.currency.clone())),
        );
        tickers.sort();
        tickers.dedup();
        for (ticker, currency) in tickers {
            self.revalue(ledger, &ticker, &currency, prices, day);
        }
    }

    pub fn unrealized_for(&self, ticker: &str, currency: &str) -> Decimal {
        self.marks
            .get(&position_key(ticker, currency))
            .map(|m| m.unrealized)
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of the unrealized values held for `currency`.
    pub fn total_for_currency(&self, currency: &str) -> Decimal {
        self.marks
            .values()
            .filter(|m| m.currency == currency)
            .map(|m| m.unrealized)
            .sum()
    }

    pub fn marks(&self) -> impl Iterator<Item = &UnrealizedMark> {
        self.marks.values()
    }
}
