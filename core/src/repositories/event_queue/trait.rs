//! Event queue repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::event::{
    EventQueueItem, PriorityCounts, QueueCounts, QueueInsert, QueueStatus,
};
use crate::errors::DomainError;

/// Persistence for `mcp_event_queue`
///
/// The idempotency key is unique when present. Claims rely on the insert
/// itself detecting the duplicate, never on a prior lookup.
#[async_trait]
pub trait EventQueueRepository: Send + Sync {
    /// Insert an item unless another item already holds its idempotency key
    ///
    /// # Returns
    /// * `Ok(QueueInsert::Inserted)` - The item was stored
    /// * `Ok(QueueInsert::Existing(item))` - The key was taken; nothing stored
    async fn insert_if_absent(&self, item: &EventQueueItem) -> Result<QueueInsert, DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventQueueItem>, DomainError>;

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<EventQueueItem>, DomainError>;

    /// Mark an item completed
    async fn mark_completed(&self, id: Uuid, processed_at: DateTime<Utc>) -> Result<(), DomainError>;

    /// Mark an item failed with the error that stopped it
    async fn mark_failed(
        &self,
        id: Uuid,
        error_message: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Move a failed item back to `status` and bump its retry count
    ///
    /// # Returns
    /// * `Ok(true)` - This caller reclaimed the item
    /// * `Ok(false)` - The item was not failed (already reclaimed or never failed)
    async fn reclaim_failed(&self, id: Uuid, status: QueueStatus) -> Result<bool, DomainError>;

    async fn count_by_status(&self) -> Result<QueueCounts, DomainError>;

    /// Pending items grouped by priority
    async fn count_pending_by_priority(&self) -> Result<PriorityCounts, DomainError>;

    /// Creation time of the most recent item
    async fn latest_created_at(&self) -> Result<Option<DateTime<Utc>>, DomainError>;
}
