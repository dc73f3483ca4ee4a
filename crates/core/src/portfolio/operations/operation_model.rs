//! Consolidated operation models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::movements::Movement;
use crate::portfolio::snapshot::percentage_of;
use crate::settings::PerformanceMethod;

/// Every movement on one ticker between the first exposure and the moment all
/// legs are flat again, summed into a single record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoImportOperation {
    pub id: String,
    pub account_id: String,
    pub ticker: String,
    pub currency: String,
    pub open_date: DateTime<Utc>,
    pub close_date: Option<DateTime<Utc>>,
    pub is_open: bool,
    pub realized: Decimal,
    /// Contribution of the most recent processing day; zero when that day did
    /// not touch the operation.
    pub realized_today: Decimal,
    pub commissions: Decimal,
    pub fees: Decimal,
    /// Net option premium, positive when collected.
    pub premium: Decimal,
    pub dividends: Decimal,
    pub dividend_taxes: Decimal,
    /// Summed `|quantity| × multiplier × price` of opening legs.
    pub capital_deployed: Decimal,
    pub capital_deployed_today: Decimal,
    pub performance: Decimal,
    pub movement_count: u64,
    pub last_activity_date: DateTime<Utc>,
    /// False once a movement contradicted the legs tracked for this operation.
    pub is_consistent: bool,
}

impl AutoImportOperation {
    pub fn operation_id(account_id: &str, ticker: &str, opened_by: &Movement) -> String {
        format!(
            "{}_{}_{}_{}",
            account_id,
            ticker,
            opened_by.timestamp.format("%Y%m%d"),
            opened_by.sequence
        )
    }

    /// Fresh operation opened by `movement`, all totals at zero.
    pub fn open(account_id: &str, ticker: &str, movement: &Movement) -> Self {
        AutoImportOperation {
            id: Self::operation_id(account_id, ticker, movement),
            account_id: account_id.to_string(),
            ticker: ticker.to_string(),
            currency: movement.currency.clone(),
            open_date: movement.timestamp,
            close_date: None,
            is_open: true,
            realized: Decimal::ZERO,
            realized_today: Decimal::ZERO,
            commissions: Decimal::ZERO,
            fees: Decimal::ZERO,
            premium: Decimal::ZERO,
            dividends: Decimal::ZERO,
            dividend_taxes: Decimal::ZERO,
            capital_deployed: Decimal::ZERO,
            capital_deployed_today: Decimal::ZERO,
            performance: Decimal::ZERO,
            movement_count: 0,
            last_activity_date: movement.timestamp,
            is_consistent: true,
        }
    }

    pub fn close(&mut self, at: DateTime<Utc>) {
        self.is_open = false;
        self.close_date = Some(at);
    }

    pub fn recalculate_performance(&mut self, method: PerformanceMethod) {
        self.performance = match method {
            PerformanceMethod::ReturnOnCapitalDeployed => {
                percentage_of(self.realized, self.capital_deployed)
            }
            PerformanceMethod::ReturnOnPremium => percentage_of(self.realized, self.premium.abs()),
        };
    }
}
