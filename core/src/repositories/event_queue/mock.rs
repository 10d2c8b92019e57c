//! In-memory implementation of EventQueueRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::event::{
    EventQueueItem, PriorityCounts, QueueCounts, QueueInsert, QueueStatus,
};
use crate::errors::DomainError;

use super::EventQueueRepository;

/// Mock event queue backed by a vector behind one lock
#[derive(Clone, Default)]
pub struct MockEventQueueRepository {
    items: Arc<RwLock<Vec<EventQueueItem>>>,
    should_fail: Arc<AtomicBool>,
    fail_completion: Arc<AtomicBool>,
}

impl MockEventQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether writes should fail
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Set whether only `mark_completed` should fail
    pub fn set_fail_completion(&self, fail: bool) {
        self.fail_completion.store(fail, Ordering::SeqCst);
    }

    /// Seed an item directly, bypassing idempotency checks
    pub async fn seed(&self, item: EventQueueItem) {
        self.items.write().await.push(item);
    }

    pub async fn all_items(&self) -> Vec<EventQueueItem> {
        self.items.read().await.clone()
    }

    fn check_failure(&self) -> Result<(), DomainError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(DomainError::internal("Mock event queue error"));
        }
        Ok(())
    }
}

#[async_trait]
impl EventQueueRepository for MockEventQueueRepository {
    async fn insert_if_absent(&self, item: &EventQueueItem) -> Result<QueueInsert, DomainError> {
        self.check_failure()?;
        let mut items = self.items.write().await;

        if let Some(key) = item.idempotency_key.as_deref() {
            if let Some(existing) = items
                .iter()
                .find(|i| i.idempotency_key.as_deref() == Some(key))
            {
                return Ok(QueueInsert::Existing(existing.clone()));
            }
        }

        items.push(item.clone());
        Ok(QueueInsert::Inserted)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventQueueItem>, DomainError> {
        let items = self.items.read().await;
        Ok(items.iter().find(|i| i.id == id).cloned())
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<EventQueueItem>, DomainError> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .find(|i| i.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn mark_completed(&self, id: Uuid, processed_at: DateTime<Utc>) -> Result<(), DomainError> {
        self.check_failure()?;
        if self.fail_completion.load(Ordering::SeqCst) {
            return Err(DomainError::internal("Mock event queue completion error"));
        }
        let mut items = self.items.write().await;
        if let Some(item) = items.iter_mut().find(|i| i.id == id) {
            item.status = QueueStatus::Completed;
            item.processed_at = Some(processed_at);
            item.error_message = None;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        error_message: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut items = self.items.write().await;
        if let Some(item) = items.iter_mut().find(|i| i.id == id) {
            item.status = QueueStatus::Failed;
            item.processed_at = Some(processed_at);
            item.error_message = Some(error_message.to_string());
        }
        Ok(())
    }

    async fn reclaim_failed(&self, id: Uuid, status: QueueStatus) -> Result<bool, DomainError> {
        self.check_failure()?;
        let mut items = self.items.write().await;
        match items
            .iter_mut()
            .find(|i| i.id == id && i.status == QueueStatus::Failed)
        {
            Some(item) => {
                item.status = status;
                item.retry_count += 1;
                item.error_message = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_by_status(&self) -> Result<QueueCounts, DomainError> {
        let items = self.items.read().await;
        let mut counts = QueueCounts::default();
        for item in items.iter() {
            counts.add(item.status, 1);
        }
        Ok(counts)
    }

    async fn count_pending_by_priority(&self) -> Result<PriorityCounts, DomainError> {
        let items = self.items.read().await;
        let mut counts = PriorityCounts::default();
        for item in items.iter().filter(|i| i.status == QueueStatus::Pending) {
            counts.add(item.priority, 1);
        }
        Ok(counts)
    }

    async fn latest_created_at(&self) -> Result<Option<DateTime<Utc>>, DomainError> {
        let items = self.items.read().await;
        Ok(items.iter().map(|i| i.created_at).max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::event::Priority;

    fn item(key: Option<&str>) -> EventQueueItem {
        EventQueueItem::new(
            "custom.event",
            "minu-find",
            serde_json::json!({}),
            Priority::Normal,
            Utc::now(),
        )
        .with_idempotency_key(key.map(str::to_string))
    }

    #[tokio::test]
    async fn test_insert_if_absent_returns_existing() {
        let repo = MockEventQueueRepository::new();
        let first = item(Some("abc"));
        let second = item(Some("abc"));

        assert_eq!(repo.insert_if_absent(&first).await.unwrap(), QueueInsert::Inserted);
        match repo.insert_if_absent(&second).await.unwrap() {
            QueueInsert::Existing(existing) => assert_eq!(existing.id, first.id),
            QueueInsert::Inserted => panic!("duplicate key was inserted"),
        }
        assert_eq!(repo.all_items().await.len(), 1);
    }

    #[tokio::test]
    async fn test_items_without_key_always_insert() {
        let repo = MockEventQueueRepository::new();
        repo.insert_if_absent(&item(None)).await.unwrap();
        repo.insert_if_absent(&item(None)).await.unwrap();
        assert_eq!(repo.count_by_status().await.unwrap().pending, 2);
    }

    #[tokio::test]
    async fn test_reclaim_only_failed_items() {
        let repo = MockEventQueueRepository::new();
        let queued = item(Some("k"));
        repo.insert_if_absent(&queued).await.unwrap();

        assert!(!repo.reclaim_failed(queued.id, QueueStatus::Processing).await.unwrap());

        repo.mark_failed(queued.id, "boom", Utc::now()).await.unwrap();
        assert!(repo.reclaim_failed(queued.id, QueueStatus::Processing).await.unwrap());
        assert!(!repo.reclaim_failed(queued.id, QueueStatus::Processing).await.unwrap());

        let reclaimed = repo.find_by_id(queued.id).await.unwrap().unwrap();
        assert_eq!(reclaimed.status, QueueStatus::Processing);
        assert_eq!(reclaimed.retry_count, 1);
    }
}
