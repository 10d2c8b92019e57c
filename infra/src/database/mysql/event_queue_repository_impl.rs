//! MySQL implementation of the EventQueueRepository trait.
//!
//! Idempotent claims insert first and fall back to reading the existing row
//! when the UNIQUE index on `idempotency_key` rejects the insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use uuid::Uuid;

use mcp_core::domain::entities::event::{
    EventQueueItem, Priority, PriorityCounts, QueueCounts, QueueInsert, QueueStatus,
};
use mcp_core::errors::DomainError;
use mcp_core::repositories::EventQueueRepository;

use super::{column, db_error, is_unique_violation, parse_enum, parse_json, parse_uuid};

const QUEUE_COLUMNS: &str = r#"
    id, event_type, source_service, target_service, payload, priority, status,
    retry_count, idempotency_key, created_at, processed_at, error_message
"#;

/// MySQL implementation of EventQueueRepository
pub struct MySqlEventQueueRepository {
    pool: MySqlPool,
}

impl MySqlEventQueueRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_item(row: &sqlx::mysql::MySqlRow) -> Result<EventQueueItem, DomainError> {
        let id: String = column(row, "id")?;
        let payload: String = column(row, "payload")?;
        let priority: String = column(row, "priority")?;
        let status: String = column(row, "status")?;

        Ok(EventQueueItem {
            id: parse_uuid(&id)?,
            event_type: column(row, "event_type")?,
            source_service: column(row, "source_service")?,
            target_service: column(row, "target_service")?,
            payload: parse_json(&payload)?,
            priority: parse_enum::<Priority>(&priority)?,
            status: parse_enum::<QueueStatus>(&status)?,
            retry_count: column(row, "retry_count")?,
            idempotency_key: column(row, "idempotency_key")?,
            created_at: column(row, "created_at")?,
            processed_at: column(row, "processed_at")?,
            error_message: column(row, "error_message")?,
        })
    }
}

#[async_trait]
impl EventQueueRepository for MySqlEventQueueRepository {
    async fn insert_if_absent(&self, item: &EventQueueItem) -> Result<QueueInsert, DomainError> {
        let query = r#"
            INSERT INTO mcp_event_queue (
                id, event_type, source_service, target_service, payload, priority, status,
                retry_count, idempotency_key, created_at, processed_at, error_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        let payload = serde_json::to_string(&item.payload).map_err(|e| DomainError::Internal {
            message: format!("Failed to encode queue payload: {}", e),
        })?;

        let inserted = sqlx::query(query)
            .bind(item.id.to_string())
            .bind(&item.event_type)
            .bind(&item.source_service)
            .bind(&item.target_service)
            .bind(payload)
            .bind(item.priority.as_str())
            .bind(item.status.as_str())
            .bind(item.retry_count)
            .bind(&item.idempotency_key)
            .bind(item.created_at)
            .bind(item.processed_at)
            .bind(&item.error_message)
            .execute(&self.pool)
            .await;

        match inserted {
            Ok(_) => Ok(QueueInsert::Inserted),
            Err(e) if is_unique_violation(&e) => {
                let key = item.idempotency_key.as_deref().unwrap_or_default();
                match self.find_by_idempotency_key(key).await? {
                    Some(existing) => Ok(QueueInsert::Existing(existing)),
                    None => Err(DomainError::internal(format!(
                        "Idempotency key {} conflicted but no row was found",
                        key
                    ))),
                }
            }
            Err(e) => Err(db_error("Failed to insert queue item", e)),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventQueueItem>, DomainError> {
        let query = format!("SELECT {} FROM mcp_event_queue WHERE id = ? LIMIT 1", QUEUE_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find queue item", e))?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<EventQueueItem>, DomainError> {
        let query = format!(
            "SELECT {} FROM mcp_event_queue WHERE idempotency_key = ? LIMIT 1",
            QUEUE_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find queue item by key", e))?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn mark_completed(&self, id: Uuid, processed_at: DateTime<Utc>) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE mcp_event_queue
            SET status = 'completed', processed_at = ?, error_message = NULL
            WHERE id = ?
            "#,
        )
        .bind(processed_at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to complete queue item", e))?;

        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        error_message: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE mcp_event_queue
            SET status = 'failed', processed_at = ?, error_message = ?
            WHERE id = ?
            "#,
        )
        .bind(processed_at)
        .bind(error_message)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fail queue item", e))?;

        Ok(())
    }

    async fn reclaim_failed(&self, id: Uuid, status: QueueStatus) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE mcp_event_queue
            SET status = ?, retry_count = retry_count + 1, error_message = NULL
            WHERE id = ? AND status = 'failed'
            "#,
        )
        .bind(status.as_str())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to reclaim queue item", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn count_by_status(&self) -> Result<QueueCounts, DomainError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM mcp_event_queue GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count queue items", e))?;

        let mut counts = QueueCounts::default();
        for row in &rows {
            let status: String = column(row, "status")?;
            let count: i64 = column(row, "count")?;
            counts.add(parse_enum::<QueueStatus>(&status)?, count.max(0) as u64);
        }
        Ok(counts)
    }

    async fn count_pending_by_priority(&self) -> Result<PriorityCounts, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT priority, COUNT(*) AS count
            FROM mcp_event_queue
            WHERE status = 'pending'
            GROUP BY priority
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to count pending items", e))?;

        let mut counts = PriorityCounts::default();
        for row in &rows {
            let priority: String = column(row, "priority")?;
            let count: i64 = column(row, "count")?;
            counts.add(parse_enum::<Priority>(&priority)?, count.max(0) as u64);
        }
        Ok(counts)
    }

    async fn latest_created_at(&self) -> Result<Option<DateTime<Utc>>, DomainError> {
        let row = sqlx::query("SELECT MAX(created_at) AS latest FROM mcp_event_queue")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to read latest queue item", e))?;

        column(&row, "latest")
    }
}
