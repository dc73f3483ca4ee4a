//! The per-account fold threaded through the movement stream.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::processing_model::{ChunkOutcome, FlushOutcome, ProcessingWarning};
use crate::errors::{InvalidMovementError, InvalidMovementReason, Result};
use crate::movements::Movement;
use crate::portfolio::ledger::PositionLedger;
use crate::portfolio::operations::{AutoImportOperation, OperationConsolidator};
use crate::portfolio::snapshot::{BrokerFinancialSnapshot, SnapshotBuilder};
use crate::portfolio::ticker_snapshot::{TickerCurrencySnapshot, TickerSnapshotBuilder};
use crate::portfolio::valuation::UnrealizedTracker;
use crate::quotes::PriceProviderTrait;
use crate::settings::EngineSettings;

/// Records collected while folding a chunk.
#[derive(Default)]
struct ChunkRecords {
    broker_snapshots: Vec<BrokerFinancialSnapshot>,
    ticker_snapshots: Vec<TickerCurrencySnapshot>,
    warnings: Vec<ProcessingWarning>,
}

/// Everything accumulated for one account so far.
///
/// The state is an owned value: [`AccountState::apply_chunk`] consumes it and
/// hands back the next one, and it serializes into a checkpoint between chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    account_id: String,
    valuation_timezone: Tz,
    last_sequence: Option<u64>,
    last_timestamp: Option<DateTime<Utc>>,
    applied_count: u64,
    ledger: PositionLedger,
    marks: UnrealizedTracker,
    snapshots: SnapshotBuilder,
    ticker_snapshots: TickerSnapshotBuilder,
    operations: OperationConsolidator,
}

impl AccountState {
    pub fn new(account_id: &str, settings: &EngineSettings) -> Self {
        AccountState {
            account_id: account_id.to_string(),
            valuation_timezone: settings.valuation_timezone,
            last_sequence: None,
            last_timestamp: None,
            applied_count: 0,
            ledger: PositionLedger::new(account_id),
            marks: UnrealizedTracker::new(),
            snapshots: SnapshotBuilder::new(account_id),
            ticker_snapshots: TickerSnapshotBuilder::new(account_id),
            operations: OperationConsolidator::new(account_id, settings.performance_method),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    pub fn applied_count(&self) -> u64 {
        self.applied_count
    }

    pub fn open_day(&self) -> Option<NaiveDate> {
        self.snapshots.open_day()
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn snapshot_builder(&self) -> &SnapshotBuilder {
        &self.snapshots
    }

    pub fn ticker_snapshot_builder(&self) -> &TickerSnapshotBuilder {
        &self.ticker_snapshots
    }

    pub fn operation(&self, ticker: &str) -> Option<&AutoImportOperation> {
        self.operations.operation(ticker)
    }

    /// Folds a chunk of movements, in sequence order, into the state.
    ///
    /// The first invalid movement fails the whole call. The consumed state is
    /// dropped, so the caller falls back to its last checkpoint.
    pub fn apply_chunk(
        mut self,
        movements: &[Movement],
        prices: &dyn PriceProviderTrait,
    ) -> Result<ChunkOutcome> {
        let mut records = ChunkRecords::default();
        for movement in movements {
            self.apply_movement(movement, prices, &mut records)?;
        }

        let operations = self.operations.drain_touched();
        debug!(
            "Account {} folded {} movements: {} snapshots, {} ticker snapshots, {} operations",
            self.account_id,
            movements.len(),
            records.broker_snapshots.len(),
            records.ticker_snapshots.len(),
            operations.len()
        );

        Ok(ChunkOutcome {
            state: self,
            broker_snapshots: records.broker_snapshots,
            ticker_snapshots: records.ticker_snapshots,
            operations,
            warnings: records.warnings,
            applied: movements.len() as u64,
        })
    }

    /// Renders the open day "as of now" without sealing it.
    pub fn flush(&self, prices: &dyn PriceProviderTrait) -> FlushOutcome {
        let Some(day) = self.snapshots.open_day() else {
            return FlushOutcome::default();
        };
        let mut marks = self.marks.clone();
        marks.revalue_all(&self.ledger, prices, day);
        FlushOutcome {
            broker_snapshots: self.snapshots.snapshots(&self.ledger, &marks),
            ticker_snapshots: self.ticker_snapshots.snapshots(&self.ledger, &marks),
        }
    }

    fn reject(&self, movement: &Movement, reason: InvalidMovementReason) -> crate::errors::Error {
        warn!(
            "Rejecting movement {} (sequence {}) of account {}: {}",
            movement.id, movement.sequence, self.account_id, reason
        );
        InvalidMovementError {
            account_id: self.account_id.clone(),
            sequence: movement.sequence,
            kind: movement.kind_label().to_string(),
            reason,
        }
        .into()
    }

    fn validate(&self, movement: &Movement) -> Result<()> {
        if movement.account_id != self.account_id {
            return Err(self.reject(
                movement,
                InvalidMovementReason::AccountMismatch {
                    found: movement.account_id.clone(),
                },
            ));
        }
        if let Some(previous) = self.last_sequence {
            if movement.sequence <= previous {
                return Err(self.reject(
                    movement,
                    InvalidMovementReason::OutOfOrder {
                        previous,
                        sequence: movement.sequence,
                    },
                ));
            }
        }
        if let Some(last) = self.last_timestamp {
            if movement.timestamp < last {
                return Err(self.reject(
                    movement,
                    InvalidMovementReason::Malformed(format!(
                        "timestamp {} precedes previously applied {}",
                        movement.timestamp, last
                    )),
                ));
            }
        }
        movement
            .validate_shape()
            .map_err(|reason| self.reject(movement, reason))
    }

    fn seal(&mut self, day: NaiveDate, prices: &dyn PriceProviderTrait, records: &mut ChunkRecords) {
        self.marks.revalue_all(&self.ledger, prices, day);
        records
            .broker_snapshots
            .extend(self.snapshots.snapshots(&self.ledger, &self.marks));
        records
            .ticker_snapshots
            .extend(self.ticker_snapshots.snapshots(&self.ledger, &self.marks));
        debug!("Account {} sealed {}", self.account_id, day);
    }

    fn apply_movement(
        &mut self,
        movement: &Movement,
        prices: &dyn PriceProviderTrait,
        records: &mut ChunkRecords,
    ) -> Result<()> {
        self.validate(movement)?;

        let day = movement.date_in(self.valuation_timezone);
        let opens_day = self.snapshots.open_day() != Some(day);
        if let Some(open) = self.snapshots.open_day() {
            if open != day {
                self.seal(open, prices, records);
            }
        }

        let delta = self.ledger.apply(movement)?;

        if opens_day {
            self.operations.begin_day(day);
        }
        self.snapshots.begin_day(day);
        self.ticker_snapshots.begin_day(day);
        self.snapshots.apply(movement, &delta);
        self.ticker_snapshots.apply(movement, &delta);
        if let Some(unbalanced) = self.operations.apply(day, movement, &delta) {
            records
                .warnings
                .push(ProcessingWarning::UnbalancedOperation(unbalanced));
        }

        self.last_sequence = Some(movement.sequence);
        self.last_timestamp = Some(movement.timestamp);
        self.applied_count += 1;
        Ok(())
    }
}
