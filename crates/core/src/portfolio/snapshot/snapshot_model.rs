//! Daily financial snapshot models.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::constants::PERCENTAGE_PRECISION;

/// Cumulative financial state of one account currency as of the end of a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerFinancialSnapshot {
    pub id: String,
    pub date: NaiveDate,
    pub account_id: String,
    pub currency: String,
    pub movement_counter: u64,
    pub realized_gains: Decimal,
    pub realized_percentage: Decimal,
    pub unrealized_gains: Decimal,
    pub unrealized_gains_percentage: Decimal,
    pub invested: Decimal,
    pub commissions: Decimal,
    pub fees: Decimal,
    pub deposited: Decimal,
    pub withdrawn: Decimal,
    pub dividends_received: Decimal,
    pub options_income: Decimal,
    pub other_income: Decimal,
    pub open_trades: bool,
    pub net_cash_flow: Decimal,
    pub cash_balance: Decimal,
}

impl BrokerFinancialSnapshot {
    pub fn snapshot_id(account_id: &str, currency: &str, date: NaiveDate) -> String {
        format!("{}_{}_{}", account_id, currency, date.format("%Y-%m-%d"))
    }

    /// Recomputes the cash-flow identity from the stored accumulators.
    pub fn expected_net_cash_flow(&self) -> Decimal {
        net_cash_flow(
            self.deposited,
            self.withdrawn,
            self.dividends_received,
            self.options_income,
            self.other_income,
            self.commissions,
            self.fees,
        )
    }
}

/// Running accumulators of one currency bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialState {
    pub currency: String,
    pub movement_counter: u64,
    pub realized_gains: Decimal,
    pub commissions: Decimal,
    pub fees: Decimal,
    pub deposited: Decimal,
    pub withdrawn: Decimal,
    pub dividends_received: Decimal,
    pub options_income: Decimal,
    pub other_income: Decimal,
    pub cash_balance: Decimal,
}

impl FinancialState {
    pub fn new(currency: &str) -> Self {
        FinancialState {
            currency: currency.to_string(),
            movement_counter: 0,
            realized_gains: Decimal::ZERO,
            commissions: Decimal::ZERO,
            fees: Decimal::ZERO,
            deposited: Decimal::ZERO,
            withdrawn: Decimal::ZERO,
            dividends_received: Decimal::ZERO,
            options_income: Decimal::ZERO,
            other_income: Decimal::ZERO,
            cash_balance: Decimal::ZERO,
        }
    }

    pub fn net_cash_flow(&self) -> Decimal {
        net_cash_flow(
            self.deposited,
            self.withdrawn,
            self.dividends_received,
            self.options_income,
            self.other_income,
            self.commissions,
            self.fees,
        )
    }
}

/// Cash actually moved in and out of the account. Realized gains are excluded
/// since the trade cash flows that produced them are already counted.
pub fn net_cash_flow(
    deposited: Decimal,
    withdrawn: Decimal,
    dividends_received: Decimal,
    options_income: Decimal,
    other_income: Decimal,
    commissions: Decimal,
    fees: Decimal,
) -> Decimal {
    deposited - withdrawn + dividends_received + options_income + other_income - commissions - fees
}

pub fn round_percentage(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PERCENTAGE_PRECISION, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator × 100`, zero when the denominator is zero.
pub fn percentage_of(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    round_percentage(numerator / denominator * Decimal::ONE_HUNDRED)
}

/// Realized return against invested capital, or against net cash flow when
/// nothing is invested.
pub fn realized_percentage(realized: Decimal, invested: Decimal, net_cash_flow: Decimal) -> Decimal {
    let denominator = if invested.is_zero() {
        net_cash_flow
    } else {
        invested
    };
    percentage_of(realized, denominator)
}

pub fn unrealized_percentage(unrealized: Decimal, invested: Decimal) -> Decimal {
    percentage_of(unrealized, invested)
}
