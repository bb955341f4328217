use uuid::Uuid;

use crate::{ErrorRecord, StoreError};

/// Persistent home for [`ErrorRecord`]s.
#[async_trait::async_trait]
pub trait ErrorStore: Send + Sync {
    /// Human-readable store name, for diagnostics.
    fn name(&self) -> &str;

    async fn log(&self, record: ErrorRecord) -> Result<Uuid, StoreError>;

    async fn get(&self, id: Uuid) -> Result<ErrorRecord, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Every record, newest first.
    async fn all(&self) -> Result<Vec<ErrorRecord>, StoreError>;

    /// Returns `false` if there was nothing to delete.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
