//! Processing event types.

use serde::{Deserialize, Serialize};

/// Events emitted while the engine folds accounts.
///
/// Hosts use them to drive progress indicators and to refresh views once an
/// account's records are persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessingEvent {
    /// An account run began. `total_estimate` counts every stored movement.
    AccountStarted {
        account_id: String,
        total_estimate: u64,
    },

    /// A chunk was folded and its records persisted.
    ChunkProcessed {
        account_id: String,
        processed_count: u64,
        total_estimate: u64,
    },

    AccountCompleted {
        account_id: String,
        processed_count: u64,
    },

    /// The run stopped on an error. Records persisted before it stay valid.
    AccountFailed { account_id: String, message: String },

    AccountCancelled {
        account_id: String,
        processed_count: u64,
    },
}

impl ProcessingEvent {
    pub fn account_id(&self) -> &str {
        match self {
            ProcessingEvent::AccountStarted { account_id, .. }
            | ProcessingEvent::ChunkProcessed { account_id, .. }
            | ProcessingEvent::AccountCompleted { account_id, .. }
            | ProcessingEvent::AccountFailed { account_id, .. }
            | ProcessingEvent::AccountCancelled { account_id, .. } => account_id,
        }
    }
}
