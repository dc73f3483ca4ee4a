use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::AutoImportOperation;
use crate::errors::UnbalancedOperationError;
use crate::movements::{Movement, MovementKind};
use crate::portfolio::ledger::PositionDelta;
use crate::settings::PerformanceMethod;

/// Latest operation of one ticker plus the bookkeeping needed to update it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationTrack {
    operation: AutoImportOperation,
    /// Signed open quantity per leg as seen by this operation.
    legs: BTreeMap<String, Decimal>,
    /// Processing day the baselines below belong to.
    baseline_day: Option<NaiveDate>,
    /// Cumulative values as of the end of the previous processing day.
    realized_baseline: Decimal,
    capital_baseline: Decimal,
}

impl OperationTrack {
    fn new(operation: AutoImportOperation) -> Self {
        OperationTrack {
            operation,
            legs: BTreeMap::new(),
            baseline_day: None,
            realized_baseline: Decimal::ZERO,
            capital_baseline: Decimal::ZERO,
        }
    }

    fn roll_to(&mut self, day: NaiveDate) {
        if self.baseline_day != Some(day) {
            self.realized_baseline = self.operation.realized;
            self.capital_baseline = self.operation.capital_deployed;
            self.baseline_day = Some(day);
        }
    }
}

/// Groups one account's ticker movements into [`AutoImportOperation`]s.
///
/// Per ticker: no operation, then open until every leg is flat and no
/// assigned premium is pending, then closed.
/// Exposure after a close starts a new operation with zeroed totals. Strategies
/// opened while the operation is still open are summed into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationConsolidator {
    account_id: String,
    performance_method: PerformanceMethod,
    tracks: BTreeMap<String, OperationTrack>,
    /// Tickers whose operation changed since the last drain.
    dirty: BTreeSet<String>,
    /// Closed operations replaced by a new one before they were drained.
    retired: Vec<AutoImportOperation>,
}

impl OperationConsolidator {
    pub fn new(account_id: &str, performance_method: PerformanceMethod) -> Self {
        OperationConsolidator {
            account_id: account_id.to_string(),
            performance_method,
            ..Default::default()
        }
    }

    /// Moves every open operation to processing day `day`.
    ///
    /// Open operations untouched on `day` contributed nothing to it, so their
    /// today figures drop to zero and they are re-emitted with the next drain.
    pub fn begin_day(&mut self, day: NaiveDate) {
        for (ticker, track) in self.tracks.iter_mut() {
            if !track.operation.is_open || track.baseline_day == Some(day) {
                continue;
            }
            track.roll_to(day);
            let operation = &mut track.operation;
            if !operation.realized_today.is_zero() || !operation.capital_deployed_today.is_zero() {
                operation.realized_today = Decimal::ZERO;
                operation.capital_deployed_today = Decimal::ZERO;
                self.dirty.insert(ticker.clone());
            }
        }
    }

    /// Applies a ledger-accepted movement on processing day `day`.
    ///
    /// Cash movements without a ticker are ignored. Returns an error value when
    /// the movement contradicts the legs this operation tracks; the movement's
    /// totals are still applied and the operation is flagged inconsistent.
    pub fn apply(
        &mut self,
        day: NaiveDate,
        movement: &Movement,
        delta: &PositionDelta,
    ) -> Option<UnbalancedOperationError> {
        let ticker = movement.ticker.as_deref()?;
        let changes_exposure = delta.leg_id.is_some();

        let starts_new = match self.tracks.get(ticker) {
            None => true,
            Some(track) => !track.operation.is_open && changes_exposure,
        };
        if starts_new {
            self.start_operation(ticker, movement, changes_exposure);
        }

        let method = self.performance_method;
        let account_id = self.account_id.clone();
        let Some(track) = self.tracks.get_mut(ticker) else {
            return None;
        };
        track.roll_to(day);

        let mut unbalanced = None;
        if let Some(leg_id) = &delta.leg_id {
            let tracked = track.legs.get(leg_id).copied().unwrap_or(Decimal::ZERO);
            if tracked != delta.quantity_before {
                let err = UnbalancedOperationError {
                    account_id,
                    ticker: ticker.to_string(),
                    sequence: movement.sequence,
                    reason: format!(
                        "leg {} moves from {} but operation {} tracks {}",
                        leg_id, delta.quantity_before, track.operation.id, tracked
                    ),
                };
                warn!("{}", err);
                track.operation.is_consistent = false;
                unbalanced = Some(err);
            }
            if delta.quantity_after.is_zero() {
                track.legs.remove(leg_id);
            } else {
                track.legs.insert(leg_id.clone(), delta.quantity_after);
            }
        }

        let operation = &mut track.operation;
        operation.realized += delta.realized;
        operation.commissions += movement.commission;
        operation.fees += movement.fee;
        match &movement.kind {
            MovementKind::OptionTrade { .. } => operation.premium += movement.amount,
            MovementKind::Dividend { tax_withheld } => {
                operation.dividends += movement.amount;
                operation.dividend_taxes += *tax_withheld;
            }
            MovementKind::Trade { .. }
            | MovementKind::Deposit
            | MovementKind::Withdrawal
            | MovementKind::Conversion { .. }
            | MovementKind::FeeOnly
            | MovementKind::Interest => {}
        }
        if delta.is_opening() {
            operation.capital_deployed += delta.opening_notional;
        }
        operation.realized_today = operation.realized - track.realized_baseline;
        operation.capital_deployed_today = operation.capital_deployed - track.capital_baseline;
        operation.movement_count += 1;
        operation.last_activity_date = movement.timestamp;
        operation.recalculate_performance(method);

        // Assigned premium waiting for the share delivery keeps the strategy open.
        let flat = track.legs.is_empty() && delta.pending_adjustment.is_zero();
        if changes_exposure && operation.is_open && flat {
            debug!(
                "Operation {} closed by sequence {}",
                operation.id, movement.sequence
            );
            operation.close(movement.timestamp);
        }

        self.dirty.insert(ticker.to_string());
        unbalanced
    }

    fn start_operation(&mut self, ticker: &str, movement: &Movement, changes_exposure: bool) {
        if let Some(previous) = self.tracks.remove(ticker) {
            if self.dirty.remove(ticker) {
                self.retired.push(previous.operation);
            }
        }

        let mut operation = AutoImportOperation::open(&self.account_id, ticker, movement);
        if !changes_exposure {
            // Income on a ticker never held here: the record opens and closes at once.
            operation.close(movement.timestamp);
        }
        debug!("Operation {} started on {}", operation.id, ticker);
        self.tracks
            .insert(ticker.to_string(), OperationTrack::new(operation));
    }

    /// Operations changed since the previous call, oldest first per ticker.
    pub fn drain_touched(&mut self) -> Vec<AutoImportOperation> {
        let mut touched = std::mem::take(&mut self.retired);
        for ticker in std::mem::take(&mut self.dirty) {
            if let Some(track) = self.tracks.get(&ticker) {
                touched.push(track.operation.clone());
            }
        }
        touched
    }

    /// The latest operation of `ticker`, open or closed.
    pub fn operation(&self, ticker: &str) -> Option<&AutoImportOperation> {
        self.tracks.get(ticker).map(|t| &t.operation)
    }

    pub fn open_operations(&self) -> impl Iterator<Item = &AutoImportOperation> {
        self.tracks
            .values()
            .map(|t| &t.operation)
            .filter(|op| op.is_open)
    }
}
