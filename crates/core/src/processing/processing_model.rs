//! Processing run models.

use serde::{Deserialize, Serialize};

use super::AccountState;
use crate::errors::{Error, Result, UnbalancedOperationError};
use crate::portfolio::operations::AutoImportOperation;
use crate::portfolio::snapshot::BrokerFinancialSnapshot;
use crate::portfolio::ticker_snapshot::TickerCurrencySnapshot;

/// Non-fatal issue found while folding an account.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingWarning {
    UnbalancedOperation(UnbalancedOperationError),
}

impl std::fmt::Display for ProcessingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingWarning::UnbalancedOperation(err) => write!(f, "{}", err),
        }
    }
}

/// Result of folding one chunk: the next state plus every record emitted.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub state: AccountState,
    /// Snapshots of days sealed during the chunk.
    pub broker_snapshots: Vec<BrokerFinancialSnapshot>,
    pub ticker_snapshots: Vec<TickerCurrencySnapshot>,
    /// Latest version of each operation touched during the chunk.
    pub operations: Vec<AutoImportOperation>,
    pub warnings: Vec<ProcessingWarning>,
    pub applied: u64,
}

/// Provisional records for the day still open after the last movement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushOutcome {
    pub broker_snapshots: Vec<BrokerFinancialSnapshot>,
    pub ticker_snapshots: Vec<TickerCurrencySnapshot>,
}

/// Persisted fold state of one account, written after every chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingCheckpoint {
    pub account_id: String,
    pub last_sequence: Option<u64>,
    pub processed_count: u64,
    pub state: AccountState,
}

impl ProcessingCheckpoint {
    pub fn new(state: &AccountState, processed_count: u64) -> Self {
        ProcessingCheckpoint {
            account_id: state.account_id().to_string(),
            last_sequence: state.last_sequence(),
            processed_count,
            state: state.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRunStatus {
    Completed,
    Cancelled,
    Failed,
}

/// Outcome of one account's run.
#[derive(Debug)]
pub struct AccountRunReport {
    pub account_id: String,
    pub status: AccountRunStatus,
    /// Movements folded in total, including earlier runs resumed from a checkpoint.
    pub processed_count: u64,
    pub last_sequence: Option<u64>,
    pub warnings: Vec<ProcessingWarning>,
    pub error: Option<Error>,
}

impl AccountRunReport {
    pub fn is_completed(&self) -> bool {
        self.status == AccountRunStatus::Completed
    }
}
