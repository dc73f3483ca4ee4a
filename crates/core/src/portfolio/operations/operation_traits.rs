use async_trait::async_trait;

use super::AutoImportOperation;
use crate::errors::Result;

/// Persists consolidated operations.
#[async_trait]
pub trait OperationRepositoryTrait: Send + Sync {
    /// Upsert by operation id (account, ticker and opening movement).
    async fn save_operations(&self, operations: &[AutoImportOperation]) -> Result<()>;
}
