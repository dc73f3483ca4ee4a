//! Repository trait for the external movement store.

use async_trait::async_trait;

use super::Movement;
use crate::errors::Result;

/// Read side of the movement store owned by the host application.
#[async_trait]
pub trait MovementRepositoryTrait: Send + Sync {
    /// Returns up to `limit` movements of the account with a sequence greater
    /// than `after_sequence` (all when `None`), in ascending sequence order.
    async fn fetch_movements(
        &self,
        account_id: &str,
        after_sequence: Option<u64>,
        limit: usize,
    ) -> Result<Vec<Movement>>;

    /// Total number of movements stored for the account. Used as the progress estimate.
    async fn count_movements(&self, account_id: &str) -> Result<u64>;
}
