//! MySQL implementation of the AuditLogRepository trait.
//!
//! Audit rows are append-only and live in `mcp_audit_logs`.

use async_trait::async_trait;
use sqlx::MySqlPool;

use mcp_core::domain::entities::audit::AuditLog;
use mcp_core::errors::DomainError;
use mcp_core::repositories::AuditLogRepository;

use super::db_error;

/// MySQL implementation of AuditLogRepository
pub struct MySqlAuditLogRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlAuditLogRepository {
    /// Create a new MySQL audit log repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for MySqlAuditLogRepository {
    async fn create(&self, audit_log: &AuditLog) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO mcp_audit_logs (
                id, event_type, endpoint, method, service_id, client_id, status_code, success,
                error_code, request_id, ip_address, user_agent, details, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        let details = audit_log
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DomainError::Internal {
                message: format!("Failed to encode audit details: {}", e),
            })?;

        sqlx::query(query)
            .bind(audit_log.id.to_string())
            .bind(audit_log.event_type.as_str())
            .bind(&audit_log.endpoint)
            .bind(&audit_log.method)
            .bind(&audit_log.service_id)
            .bind(&audit_log.client_id)
            .bind(audit_log.status_code)
            .bind(audit_log.success)
            .bind(&audit_log.error_code)
            .bind(&audit_log.request_id)
            .bind(&audit_log.ip_address)
            .bind(&audit_log.user_agent)
            .bind(details)
            .bind(audit_log.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to create audit log", e))?;

        Ok(())
    }
}
