//! MySQL implementation of the DispatchTargetRepository trait.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::MySqlPool;

use mcp_core::domain::entities::event::{
    NotificationRecord, ServiceEventRecord, ServiceHealthRecord, ServiceIssueRecord,
};
use mcp_core::errors::DomainError;
use mcp_core::repositories::DispatchTargetRepository;

use super::{column, db_error, parse_json, parse_uuid};

/// MySQL implementation of DispatchTargetRepository
pub struct MySqlDispatchTargetRepository {
    pool: MySqlPool,
}

impl MySqlDispatchTargetRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_health(row: &sqlx::mysql::MySqlRow) -> Result<ServiceHealthRecord, DomainError> {
        let id: String = column(row, "id")?;
        let details: String = column(row, "details")?;

        Ok(ServiceHealthRecord {
            id: parse_uuid(&id)?,
            service_name: column(row, "service_name")?,
            status: column(row, "status")?,
            response_time_ms: column(row, "response_time_ms")?,
            error_rate: column(row, "error_rate")?,
            cpu_usage: column(row, "cpu_usage")?,
            memory_usage: column(row, "memory_usage")?,
            details: parse_json(&details)?,
            last_check_at: column(row, "last_check_at")?,
        })
    }
}

fn encode_json(value: &JsonValue) -> Result<String, DomainError> {
    serde_json::to_string(value)
        .map_err(|e| DomainError::internal(format!("Failed to encode JSON column: {}", e)))
}

#[async_trait]
impl DispatchTargetRepository for MySqlDispatchTargetRepository {
    async fn upsert_service_health(&self, record: &ServiceHealthRecord) -> Result<(), DomainError> {
        // The row id stays the one from the first insert
        let query = r#"
            INSERT INTO service_health (
                id, service_name, status, response_time_ms, error_rate,
                cpu_usage, memory_usage, details, last_check_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                status = VALUES(status),
                response_time_ms = VALUES(response_time_ms),
                error_rate = VALUES(error_rate),
                cpu_usage = VALUES(cpu_usage),
                memory_usage = VALUES(memory_usage),
                details = VALUES(details),
                last_check_at = VALUES(last_check_at)
        "#;

        sqlx::query(query)
            .bind(record.id.to_string())
            .bind(&record.service_name)
            .bind(&record.status)
            .bind(record.response_time_ms)
            .bind(record.error_rate)
            .bind(record.cpu_usage)
            .bind(record.memory_usage)
            .bind(encode_json(&record.details)?)
            .bind(record.last_check_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to upsert service health", e))?;

        Ok(())
    }

    async fn insert_service_issue(&self, record: &ServiceIssueRecord) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO service_issues (
                id, service_name, issue_type, severity, title,
                description, details, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        sqlx::query(query)
            .bind(record.id.to_string())
            .bind(&record.service_name)
            .bind(&record.issue_type)
            .bind(&record.severity)
            .bind(&record.title)
            .bind(&record.description)
            .bind(encode_json(&record.details)?)
            .bind(&record.status)
            .bind(record.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to insert service issue", e))?;

        Ok(())
    }

    async fn insert_service_event(&self, record: &ServiceEventRecord) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO service_events (
                id, service_name, event_type, target_service, payload, priority, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#;

        sqlx::query(query)
            .bind(record.id.to_string())
            .bind(&record.service_name)
            .bind(&record.event_type)
            .bind(&record.target_service)
            .bind(encode_json(&record.payload)?)
            .bind(record.priority.as_str())
            .bind(record.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to insert service event", e))?;

        Ok(())
    }

    async fn admin_user_ids(&self) -> Result<Vec<String>, DomainError> {
        let rows = sqlx::query("SELECT id FROM profiles WHERE role = 'admin' ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load admin profiles", e))?;

        rows.iter().map(|row| column(row, "id")).collect()
    }

    async fn insert_notifications(&self, records: &[NotificationRecord]) -> Result<usize, DomainError> {
        if records.is_empty() {
            return Ok(0);
        }

        let query = r#"
            INSERT INTO notifications (
                id, user_id, title, message, notification_type, priority, data, is_read, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        // All recipients get the row or none do
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        for record in records {
            sqlx::query(query)
                .bind(record.id.to_string())
                .bind(&record.user_id)
                .bind(&record.title)
                .bind(&record.message)
                .bind(&record.notification_type)
                .bind(record.priority.as_str())
                .bind(encode_json(&record.data)?)
                .bind(record.is_read)
                .bind(record.created_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to insert notification", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit notifications", e))?;

        Ok(records.len())
    }

    async fn latest_health_by_service(&self) -> Result<Vec<ServiceHealthRecord>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, service_name, status, response_time_ms, error_rate,
                   cpu_usage, memory_usage, details, last_check_at
            FROM service_health
            ORDER BY service_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load service health", e))?;

        rows.iter().map(Self::row_to_health).collect()
    }
}
