use chrono::{DateTime, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::QUANTITY_THRESHOLD;
use crate::movements::OptionContract;

pub fn is_quantity_significant(quantity: &Decimal) -> bool {
    let threshold =
        Decimal::from_str_radix(QUANTITY_THRESHOLD, 10).unwrap_or_else(|_| Decimal::new(1, 8));
    quantity.abs() >= threshold
}

/// Key of an equity position inside one account's ledger.
pub fn position_key(ticker: &str, currency: &str) -> String {
    format!("POS-{}-{}", ticker, currency)
}

/// Key of an option leg inside one account's ledger.
pub fn option_leg_key(symbol: &str, currency: &str) -> String {
    format!("OPT-{}-{}", symbol, currency)
}

/// Share position tracked at weighted-average cost.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub ticker: String,
    pub currency: String,
    pub quantity: Decimal,
    /// Average cost per share, commissions and fees included.
    pub average_cost: Decimal,
    pub total_cost_basis: Decimal,
    pub inception_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Position {
    pub fn new(ticker: &str, currency: &str, date: DateTime<Utc>) -> Self {
        Position {
            id: position_key(ticker, currency),
            ticker: ticker.to_string(),
            currency: currency.to_string(),
            quantity: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            total_cost_basis: Decimal::ZERO,
            inception_date: date,
            last_updated: date,
        }
    }

    pub fn is_open(&self) -> bool {
        self.quantity > Decimal::ZERO && is_quantity_significant(&self.quantity)
    }

    /// Recomputes the average from quantity and cost basis.
    fn recalculate_aggregates(&mut self) {
        if self.quantity.is_sign_positive() && is_quantity_significant(&self.quantity) {
            self.average_cost = self.total_cost_basis / self.quantity;
        } else {
            if !self.quantity.is_zero() {
                warn!(
                    "Position {} quantity ({}) became insignificant. Aggregates zeroed.",
                    self.id, self.quantity
                );
            }
            self.quantity = Decimal::ZERO;
            self.total_cost_basis = Decimal::ZERO;
            self.average_cost = Decimal::ZERO;
        }
    }

    /// Adds shares and returns the cost basis added.
    pub fn add_shares(&mut self, quantity: Decimal, cost: Decimal, date: DateTime<Utc>) -> Decimal {
        if !self.is_open() {
            self.inception_date = date;
        }
        self.quantity += quantity;
        self.total_cost_basis += cost;
        self.last_updated = date;
        self.recalculate_aggregates();
        cost
    }

    /// Removes shares at average cost and returns the cost basis released.
    /// Callers must have checked `quantity <= self.quantity`.
    pub fn remove_shares(&mut self, quantity: Decimal, date: DateTime<Utc>) -> Decimal {
        let released = if quantity >= self.quantity {
            self.total_cost_basis
        } else {
            quantity * self.average_cost
        };
        self.quantity -= quantity;
        self.total_cost_basis -= released;
        self.last_updated = date;
        self.recalculate_aggregates();
        debug!(
            "Position {} released {} of cost basis, {} shares left",
            self.id, released, self.quantity
        );
        released
    }
}

/// Open contracts of one option series. Long legs have a positive quantity,
/// short legs a negative one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptionLeg {
    pub id: String,
    pub ticker: String,
    pub symbol: String,
    pub currency: String,
    pub contract: OptionContract,
    pub quantity: Decimal,
    /// Net premium (premium minus commissions and fees) of the open contracts.
    /// Not a cost basis: it is only carried to realize it when contracts close.
    pub open_premium: Decimal,
    pub opened_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl OptionLeg {
    pub fn new(
        ticker: &str,
        currency: &str,
        contract: &OptionContract,
        date: DateTime<Utc>,
    ) -> Self {
        let symbol = contract.symbol(ticker);
        OptionLeg {
            id: option_leg_key(&symbol, currency),
            ticker: ticker.to_string(),
            symbol,
            currency: currency.to_string(),
            contract: contract.clone(),
            quantity: Decimal::ZERO,
            open_premium: Decimal::ZERO,
            opened_at: date,
            last_updated: date,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.quantity.is_zero() && is_quantity_significant(&self.quantity)
    }

    pub fn is_long(&self) -> bool {
        self.quantity.is_sign_positive() && self.is_open()
    }

    /// Detaches the open premium attributable to `contracts` closing contracts
    /// and moves the leg toward flat. Returns the detached premium.
    pub fn close_contracts(&mut self, contracts: Decimal, date: DateTime<Utc>) -> Decimal {
        let open = self.quantity.abs();
        let portion = if contracts >= open {
            self.open_premium
        } else {
            self.open_premium * contracts / open
        };
        if self.quantity.is_sign_positive() {
            self.quantity -= contracts;
        } else {
            self.quantity += contracts;
        }
        self.open_premium -= portion;
        self.last_updated = date;
        if !self.is_open() {
            self.quantity = Decimal::ZERO;
            self.open_premium = Decimal::ZERO;
        }
        portion
    }
}
