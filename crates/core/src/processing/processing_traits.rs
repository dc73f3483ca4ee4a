use async_trait::async_trait;

use super::ProcessingCheckpoint;
use crate::errors::Result;

/// Storage for per-account fold checkpoints.
#[async_trait]
pub trait CheckpointRepositoryTrait: Send + Sync {
    async fn load_checkpoint(&self, account_id: &str) -> Result<Option<ProcessingCheckpoint>>;

    /// Replaces any checkpoint stored for the same account.
    async fn save_checkpoint(&self, checkpoint: &ProcessingCheckpoint) -> Result<()>;

    async fn delete_checkpoint(&self, account_id: &str) -> Result<()>;
}
