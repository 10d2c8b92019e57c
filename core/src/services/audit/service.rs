//! Audit service recording token lifecycle and dispatch outcomes.
//!
//! A failed audit write is logged and swallowed: auditing never changes the
//! outcome returned to the caller.

use std::sync::Arc;

use crate::domain::entities::audit::{AuditEventType, AuditLog, RequestContext};
use crate::errors::DomainError;
use crate::repositories::AuditLogRepository;
use crate::services::clock::Clock;

/// Configuration for the audit service
#[derive(Debug, Clone)]
pub struct AuditServiceConfig {
    /// Whether to run audit writes on a background task
    pub async_writes: bool,
}

impl Default for AuditServiceConfig {
    fn default() -> Self {
        Self {
            async_writes: false,
        }
    }
}

/// Service for managing audit logs
pub struct AuditService {
    repository: Arc<dyn AuditLogRepository>,
    clock: Arc<dyn Clock>,
    config: AuditServiceConfig,
}

impl AuditService {
    /// Create a new audit service
    pub fn new(
        repository: Arc<dyn AuditLogRepository>,
        clock: Arc<dyn Clock>,
        config: AuditServiceConfig,
    ) -> Self {
        Self {
            repository,
            clock,
            config,
        }
    }

    /// Entry skeleton stamped with the service clock
    pub fn entry(&self, event_type: AuditEventType, ctx: &RequestContext) -> AuditLog {
        AuditLog::new(event_type, ctx).at(self.clock.now())
    }

    /// Record the outcome of an operation.
    ///
    /// Successes use `success_type`; failures use `failure_type` with the
    /// error's code and status.
    pub async fn record_outcome<T>(
        &self,
        ctx: &RequestContext,
        success_type: AuditEventType,
        failure_type: AuditEventType,
        service_id: Option<String>,
        client_id: Option<String>,
        result: &Result<T, DomainError>,
        details: Option<serde_json::Value>,
    ) {
        let log = match result {
            Ok(_) => self.entry(success_type, ctx),
            Err(error) => self
                .entry(failure_type, ctx)
                .with_status(error.status_code())
                .with_error_code(error.code()),
        }
        .with_service(service_id, client_id);

        let log = match details {
            Some(details) => log.with_details(details),
            None => log,
        };

        self.record(log).await;
    }

    /// Write an entry, logging instead of failing
    pub async fn record(&self, log: AuditLog) {
        if self.config.async_writes {
            let repository = Arc::clone(&self.repository);
            tokio::spawn(async move {
                if let Err(e) = repository.create(&log).await {
                    tracing::warn!(event_type = log.event_type.as_str(), error = %e, "Failed to write audit log");
                }
            });
        } else if let Err(e) = self.repository.create(&log).await {
            tracing::warn!(event_type = log.event_type.as_str(), error = %e, "Failed to write audit log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TokenError;
    use crate::repositories::MockAuditLogRepository;
    use crate::services::clock::FixedClock;
    use chrono::Utc;

    fn service(repo: &MockAuditLogRepository) -> AuditService {
        AuditService::new(
            Arc::new(repo.clone()),
            Arc::new(FixedClock::new(Utc::now())),
            AuditServiceConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_record_outcome_success() {
        let repo = MockAuditLogRepository::new();
        let audit = service(&repo);
        let ctx = RequestContext::new("POST", "/mcp-auth/token");

        let result: Result<(), DomainError> = Ok(());
        audit
            .record_outcome(
                &ctx,
                AuditEventType::TokenIssued,
                AuditEventType::TokenIssueFailure,
                Some("minu-find".into()),
                Some("crawler".into()),
                &result,
                None,
            )
            .await;

        let logs = repo.get_all_logs().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].event_type, AuditEventType::TokenIssued);
        assert!(logs[0].success);
    }

    #[tokio::test]
    async fn test_record_outcome_failure_carries_code() {
        let repo = MockAuditLogRepository::new();
        let audit = service(&repo);
        let ctx = RequestContext::new("POST", "/mcp-auth/verify");

        let result: Result<(), DomainError> = Err(TokenError::TokenRevoked.into());
        audit
            .record_outcome(
                &ctx,
                AuditEventType::TokenVerified,
                AuditEventType::TokenVerificationFailure,
                None,
                None,
                &result,
                Some(serde_json::json!({"reason": "test"})),
            )
            .await;

        let logs = repo.get_all_logs().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status_code, 401);
        assert_eq!(logs[0].event_type, AuditEventType::TokenVerificationFailure);
        assert!(logs[0].details.is_some());
    }

    #[tokio::test]
    async fn test_repository_failure_is_swallowed() {
        let repo = MockAuditLogRepository::new();
        repo.set_should_fail(true);
        let audit = service(&repo);
        let ctx = RequestContext::new("GET", "/mcp-router/status");

        audit.record(audit.entry(AuditEventType::StatusRead, &ctx)).await;
        assert!(repo.get_all_logs().await.is_empty());
    }
}
