//! Per-account daily snapshot accumulation.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::snapshot_model::{
    realized_percentage, unrealized_percentage, BrokerFinancialSnapshot, FinancialState,
};
use crate::movements::{Movement, MovementKind, TradeSide};
use crate::portfolio::ledger::{PositionDelta, PositionLedger};
use crate::portfolio::valuation::UnrealizedTracker;

/// Accumulates one account's movements into per-currency financial state and
/// renders the state of the open day as [`BrokerFinancialSnapshot`]s.
///
/// Every currency the account has touched is its own series. All of them are
/// rendered for each active day, so a series' counter only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotBuilder {
    account_id: String,
    open_day: Option<NaiveDate>,
    states: BTreeMap<String, FinancialState>,
}

impl SnapshotBuilder {
    pub fn new(account_id: &str) -> Self {
        SnapshotBuilder {
            account_id: account_id.to_string(),
            ..Default::default()
        }
    }

    pub fn open_day(&self) -> Option<NaiveDate> {
        self.open_day
    }

    pub fn begin_day(&mut self, day: NaiveDate) {
        if self.open_day != Some(day) {
            debug!("Account {} opens snapshot day {}", self.account_id, day);
            self.open_day = Some(day);
        }
    }

    pub fn state(&self, currency: &str) -> Option<&FinancialState> {
        self.states.get(currency)
    }

    pub fn states(&self) -> impl Iterator<Item = &FinancialState> {
        self.states.values()
    }

    fn bucket(&mut self, currency: &str) -> &mut FinancialState {
        self.states
            .entry(currency.to_string())
            .or_insert_with(|| FinancialState::new(currency))
    }

    /// Folds one movement, already accepted by the ledger, into its currency bucket.
    pub fn apply(&mut self, movement: &Movement, delta: &PositionDelta) {
        let state = self.bucket(&movement.currency);
        state.movement_counter += 1;
        let costs = movement.commission + movement.fee;

        match &movement.kind {
            MovementKind::Trade { side } => {
                state.commissions += movement.commission;
                state.fees += movement.fee;
                state.realized_gains += delta.realized;
                let notional = movement.quantity * movement.price;
                match side {
                    TradeSide::Buy => state.cash_balance -= notional + costs,
                    TradeSide::Sell => state.cash_balance += notional - costs,
                }
            }
            MovementKind::OptionTrade { .. } => {
                state.options_income += movement.amount;
                state.commissions += movement.commission;
                state.fees += movement.fee;
                state.realized_gains += delta.realized;
                state.cash_balance += movement.amount - costs;
            }
            MovementKind::Dividend { tax_withheld } => {
                let net = movement.amount - *tax_withheld;
                state.dividends_received += net;
                state.commissions += movement.commission;
                state.fees += movement.fee;
                state.cash_balance += net - costs;
            }
            MovementKind::Deposit => {
                state.deposited += movement.amount;
                state.commissions += movement.commission;
                state.fees += movement.fee;
                state.cash_balance += movement.amount - costs;
            }
            MovementKind::Withdrawal => {
                state.withdrawn += movement.amount;
                state.commissions += movement.commission;
                state.fees += movement.fee;
                state.cash_balance -= movement.amount + costs;
            }
            MovementKind::Interest => {
                state.other_income += movement.amount;
                state.commissions += movement.commission;
                state.fees += movement.fee;
                state.cash_balance += movement.amount - costs;
            }
            MovementKind::FeeOnly => {
                state.cash_balance -= movement.charge();
            }
            MovementKind::Conversion {
                to_currency,
                to_amount,
            } => {
                state.cash_balance -= movement.amount;
                self.bucket(to_currency).cash_balance += *to_amount;
            }
        }
    }

    /// Renders every currency series as of the open day.
    pub fn snapshots(
        &self,
        ledger: &PositionLedger,
        marks: &UnrealizedTracker,
    ) -> Vec<BrokerFinancialSnapshot> {
        let Some(date) = self.open_day else {
            return Vec::new();
        };

        self.states
            .values()
            .map(|state| {
                let invested = ledger.invested(&state.currency);
                let unrealized = marks.total_for_currency(&state.currency);
                let net_cash_flow = state.net_cash_flow();
                BrokerFinancialSnapshot {
                    id: BrokerFinancialSnapshot::snapshot_id(
                        &self.account_id,
                        &state.currency,
                        date,
                    ),
                    date,
                    account_id: self.account_id.clone(),
                    currency: state.currency.clone(),
                    movement_counter: state.movement_counter,
                    realized_gains: state.realized_gains,
                    realized_percentage: realized_percentage(
                        state.realized_gains,
                        invested,
                        net_cash_flow,
                    ),
                    unrealized_gains: unrealized,
                    unrealized_gains_percentage: unrealized_percentage(unrealized, invested),
                    invested,
                    commissions: state.commissions,
                    fees: state.fees,
                    deposited: state.deposited,
                    withdrawn: state.withdrawn,
                    dividends_received: state.dividends_received,
                    options_income: state.options_income,
                    other_income: state.other_income,
                    open_trades: ledger.has_open_legs(&state.currency),
                    net_cash_flow,
                    cash_balance: state.cash_balance,
                }
            })
            .collect()
    }
}
