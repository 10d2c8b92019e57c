//! Integration tests wiring token issuance, dispatch and status together

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;

    use mcp_core::domain::entities::{EventEnvelope, Priority, RequestContext};
    use mcp_core::repositories::{
        MockAuditLogRepository, MockDispatchTargetRepository, MockEventQueueRepository,
        MockTokenRepository,
    };
    use mcp_core::services::audit::{AuditService, AuditServiceConfig};
    use mcp_core::services::clock::{FixedClock, InstanceLiveness};
    use mcp_core::services::router::{EventRouter, RoutingTable};
    use mcp_core::services::status::StatusReporter;
    use mcp_core::services::token::{
        sign, CredentialVerifier, ServiceCredentials, TokenService, TokenServiceConfig,
    };
    use mcp_core::{DomainError, TokenError};
    use mcp_shared::config::WebhookSecrets;

    const SECRET: &str = "build-shared-secret";

    #[tokio::test]
    async fn test_token_to_dispatch_to_status() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let audit_repo = MockAuditLogRepository::new();
        let audit = Arc::new(AuditService::new(
            Arc::new(audit_repo.clone()),
            clock.clone(),
            AuditServiceConfig::default(),
        ));
        let queue = MockEventQueueRepository::new();
        let targets = MockDispatchTargetRepository::with_admins(["ops"]);

        let tokens = TokenService::new(
            Arc::new(MockTokenRepository::new()),
            CredentialVerifier::new(WebhookSecrets::new().with_secret("minu-build", SECRET), 300),
            audit.clone(),
            clock.clone(),
            TokenServiceConfig::new("integration-jwt-secret-32-bytes-min"),
        );
        let rules = RoutingTable::standard().unwrap();
        let rule_count = rules.len();
        let router = EventRouter::new(
            Arc::new(queue.clone()),
            Arc::new(targets.clone()),
            rules,
            audit.clone(),
            clock.clone(),
        );
        let status = StatusReporter::new(
            Arc::new(queue.clone()),
            Arc::new(targets.clone()),
            Arc::new(InstanceLiveness::new(clock_now(&clock))),
            audit.clone(),
            clock.clone(),
            rule_count,
        );

        let body = br#"{"grant_type":"service_credentials","client_id":"builder","scope":"events:write"}"#;
        let signature = sign(SECRET.as_bytes(), body);
        let timestamp = clock_now(&clock).timestamp().to_string();
        let issued = tokens
            .issue_tokens(
                &ServiceCredentials {
                    service_id: Some("minu-build"),
                    signature: Some(&format!("sha256={}", signature)),
                    timestamp: Some(&timestamp),
                    body,
                },
                &RequestContext::new("POST", "/mcp-auth/token"),
            )
            .await
            .unwrap();

        let caller = tokens
            .verify_access_token(&issued.access_token, &["events:write"])
            .await
            .unwrap();

        let envelope = EventEnvelope::new(
            "service.issue.build_failed",
            "minu-build",
            json!({"title": "Pipeline red"}),
        )
        .with_priority(Priority::High);
        let receipt = router
            .dispatch(envelope, Some("build-42"), &caller, &RequestContext::new("POST", "/mcp-router/dispatch"))
            .await
            .unwrap();
        assert_eq!(receipt.rule, "service_issue");
        assert_eq!(targets.notifications().await.len(), 1);

        // Reading status needs events:read, which this token lacks
        let denied = tokens
            .verify_access_token(&issued.access_token, &["events:read"])
            .await;
        assert!(matches!(
            denied,
            Err(DomainError::Token(TokenError::InsufficientScope { .. }))
        ));

        let report = status
            .report(&caller, &RequestContext::new("GET", "/mcp-router/status"))
            .await
            .unwrap();
        assert_eq!(report.queue.counts.completed, 1);
        assert_eq!(report.success_rate, 100.0);
        assert_eq!(report.routing_rules, 5);

        assert!(audit_repo.get_all_logs().await.len() >= 3);
    }

    fn clock_now(clock: &FixedClock) -> chrono::DateTime<Utc> {
        use mcp_core::services::clock::Clock;
        clock.now()
    }
}
