use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Running state of one (ticker, currency) holding as of the end of a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerCurrencySnapshot {
    pub id: String,
    pub date: NaiveDate,
    pub account_id: String,
    pub ticker: String,
    pub currency: String,
    pub movement_counter: u64,
    /// Shares held.
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub cost_basis: Decimal,
    /// Open option contracts on the ticker, long and short added up.
    pub open_option_contracts: Decimal,
    pub realized_gains: Decimal,
    pub unrealized_gains: Decimal,
    pub unrealized_gains_percentage: Decimal,
    pub commissions: Decimal,
    pub fees: Decimal,
    pub options_income: Decimal,
    pub dividends: Decimal,
    pub open_trades: bool,
}

impl TickerCurrencySnapshot {
    pub fn snapshot_id(account_id: &str, ticker: &str, currency: &str, date: NaiveDate) -> String {
        format!(
            "{}_{}_{}_{}",
            account_id,
            ticker,
            currency,
            date.format("%Y-%m-%d")
        )
    }
}

/// Cumulative per-ticker accumulators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerState {
    pub ticker: String,
    pub currency: String,
    pub movement_counter: u64,
    pub realized_gains: Decimal,
    pub commissions: Decimal,
    pub fees: Decimal,
    pub options_income: Decimal,
    /// Net of withholding tax.
    pub dividends: Decimal,
}

impl TickerState {
    pub fn new(ticker: &str, currency: &str) -> Self {
        TickerState {
            ticker: ticker.to_string(),
            currency: currency.to_string(),
            movement_counter: 0,
            realized_gains: Decimal::ZERO,
            commissions: Decimal::ZERO,
            fees: Decimal::ZERO,
            options_income: Decimal::ZERO,
            dividends: Decimal::ZERO,
        }
    }
}
