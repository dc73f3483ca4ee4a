//! Repository traits for emitted snapshots.

use async_trait::async_trait;

use super::BrokerFinancialSnapshot;
use crate::errors::Result;
use crate::portfolio::ticker_snapshot::TickerCurrencySnapshot;

/// Persists snapshots emitted by the engine.
///
/// Both methods are idempotent upserts keyed by the snapshot id, so replaying a
/// day replaces the stored record instead of duplicating it.
#[async_trait]
pub trait SnapshotRepositoryTrait: Send + Sync {
    /// Upsert by account, currency and date.
    async fn save_broker_snapshots(&self, snapshots: &[BrokerFinancialSnapshot]) -> Result<()>;

    /// Upsert by account, ticker, currency and date.
    async fn save_ticker_snapshots(&self, snapshots: &[TickerCurrencySnapshot]) -> Result<()>;
}
