use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::ticker_snapshot_model::{TickerCurrencySnapshot, TickerState};
use crate::movements::{Movement, MovementKind};
use crate::portfolio::ledger::{position_key, PositionDelta, PositionLedger};
use crate::portfolio::snapshot::unrealized_percentage;
use crate::portfolio::valuation::UnrealizedTracker;

/// Per (ticker, currency) counterpart of the account snapshot builder.
///
/// Only tickers with at least one movement on the open day are rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerSnapshotBuilder {
    account_id: String,
    open_day: Option<NaiveDate>,
    states: BTreeMap<String, TickerState>,
    touched_today: BTreeSet<String>,
}

impl TickerSnapshotBuilder {
    pub fn new(account_id: &str) -> Self {
        TickerSnapshotBuilder {
            account_id: account_id.to_string(),
            ..Default::default()
        }
    }

    pub fn begin_day(&mut self, day: NaiveDate) {
        if self.open_day != Some(day) {
            self.open_day = Some(day);
            self.touched_today.clear();
        }
    }

    pub fn state(&self, ticker: &str, currency: &str) -> Option<&TickerState> {
        self.states.get(&position_key(ticker, currency))
    }

    /// Folds a movement that references a ticker. Cash movements are ignored.
    pub fn apply(&mut self, movement: &Movement, delta: &PositionDelta) {
        let Some(ticker) = movement.ticker.as_deref() else {
            return;
        };
        let key = position_key(ticker, &movement.currency);
        let state = self
            .states
            .entry(key.clone())
            .or_insert_with(|| TickerState::new(ticker, &movement.currency));
        state.movement_counter += 1;
        state.realized_gains += delta.realized;

        match &movement.kind {
            MovementKind::Trade { .. } => {
                state.commissions += movement.commission;
                state.fees += movement.fee;
            }
            MovementKind::OptionTrade { .. } => {
                state.options_income += movement.amount;
                state.commissions += movement.commission;
                state.fees += movement.fee;
            }
            MovementKind::Dividend { tax_withheld } => {
                state.dividends += movement.amount - *tax_withheld;
                state.commissions += movement.commission;
                state.fees += movement.fee;
            }
            MovementKind::Deposit
            | MovementKind::Withdrawal
            | MovementKind::Conversion { .. }
            | MovementKind::FeeOnly
            | MovementKind::Interest => {
                state.commissions += movement.commission;
                state.fees += movement.fee;
            }
        }
        self.touched_today.insert(key);
    }

    /// Renders the tickers touched on the open day.
    pub fn snapshots(
        &self,
        ledger: &PositionLedger,
        marks: &UnrealizedTracker,
    ) -> Vec<TickerCurrencySnapshot> {
        let Some(date) = self.open_day else {
            return Vec::new();
        };

        self.touched_today
            .iter()
            .filter_map(|key| self.states.get(key))
            .map(|state| {
                let position = ledger
                    .position(&state.ticker, &state.currency)
                    .filter(|p| p.is_open());
                let quantity = position.map(|p| p.quantity).unwrap_or(Decimal::ZERO);
                let average_cost = position.map(|p| p.average_cost).unwrap_or(Decimal::ZERO);
                let cost_basis = position
                    .map(|p| p.total_cost_basis)
                    .unwrap_or(Decimal::ZERO);
                let open_option_contracts = ledger
                    .option_legs_for(&state.ticker, &state.currency)
                    .filter(|leg| leg.is_open())
                    .map(|leg| leg.quantity.abs())
                    .sum();
                let unrealized = marks.unrealized_for(&state.ticker, &state.currency);

                TickerCurrencySnapshot {
                    id: TickerCurrencySnapshot::snapshot_id(
                        &self.account_id,
                        &state.ticker,
                        &state.currency,
                        date,
                    ),
                    date,
                    account_id: self.account_id.clone(),
                    ticker: state.ticker.clone(),
                    currency: state.currency.clone(),
                    movement_counter: state.movement_counter,
                    quantity,
                    average_cost,
                    cost_basis,
                    open_option_contracts,
                    realized_gains: state.realized_gains,
                    unrealized_gains: unrealized,
                    unrealized_gains_percentage: unrealized_percentage(unrealized, cost_basis),
                    commissions: state.commissions,
                    fees: state.fees,
                    options_income: state.options_income,
                    dividends: state.dividends,
                    open_trades: ledger.has_open_legs_for(&state.ticker, &state.currency),
                }
            })
            .collect()
    }
}
