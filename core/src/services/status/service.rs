//! Read-only aggregation of queue depth, success rate and service health.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::audit::{AuditEventType, RequestContext};
use crate::domain::entities::event::{PriorityCounts, QueueCounts};
use crate::domain::entities::service::ServiceId;
use crate::domain::entities::token::TokenVerification;
use crate::errors::DomainError;
use crate::repositories::{DispatchTargetRepository, EventQueueRepository};
use crate::services::audit::AuditService;
use crate::services::clock::{Clock, LivenessProvider};

/// Reachability derived from a service's freshest health row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Connected,
    Degraded,
    Disconnected,
}

impl Connectivity {
    pub fn from_health_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "healthy" => Connectivity::Connected,
            "degraded" => Connectivity::Degraded,
            _ => Connectivity::Disconnected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSummary {
    #[serde(flatten)]
    pub counts: QueueCounts,
    pub total: u64,
}

/// Response of `GET /mcp-router/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterStatus {
    pub status: String,
    pub queue: QueueSummary,
    pub pending_by_priority: PriorityCounts,
    /// Percentage of completed items, two decimals
    pub success_rate: f64,
    pub last_dispatch_at: Option<DateTime<Utc>>,
    pub services: BTreeMap<String, Connectivity>,
    pub routing_rules: usize,
    pub uptime_seconds: i64,
    pub timestamp: DateTime<Utc>,
}

pub struct StatusReporter {
    queue: Arc<dyn EventQueueRepository>,
    targets: Arc<dyn DispatchTargetRepository>,
    liveness: Arc<dyn LivenessProvider>,
    audit: Arc<AuditService>,
    clock: Arc<dyn Clock>,
    routing_rules: usize,
}

impl StatusReporter {
    pub fn new(
        queue: Arc<dyn EventQueueRepository>,
        targets: Arc<dyn DispatchTargetRepository>,
        liveness: Arc<dyn LivenessProvider>,
        audit: Arc<AuditService>,
        clock: Arc<dyn Clock>,
        routing_rules: usize,
    ) -> Self {
        Self {
            queue,
            targets,
            liveness,
            audit,
            clock,
            routing_rules,
        }
    }

    /// Aggregate the current router state
    pub async fn report(
        &self,
        caller: &TokenVerification,
        ctx: &RequestContext,
    ) -> Result<RouterStatus, DomainError> {
        let result = self.collect().await;
        self.audit
            .record_outcome(
                ctx,
                AuditEventType::StatusRead,
                AuditEventType::StatusRead,
                Some(caller.service_id.to_string()),
                Some(caller.client_id.clone()),
                &result,
                None,
            )
            .await;
        result
    }

    async fn collect(&self) -> Result<RouterStatus, DomainError> {
        let counts = self.queue.count_by_status().await?;
        let pending_by_priority = self.queue.count_pending_by_priority().await?;
        let last_dispatch_at = self.queue.latest_created_at().await?;
        let health = self.targets.latest_health_by_service().await?;

        // Every known service is listed; no health row means disconnected
        let mut services: BTreeMap<String, Connectivity> = ServiceId::all_ids()
            .map(|id| (id.to_string(), Connectivity::Disconnected))
            .collect();
        for row in health {
            services.insert(
                row.service_name.clone(),
                Connectivity::from_health_status(&row.status),
            );
        }

        let now = self.clock.now();
        Ok(RouterStatus {
            status: "operational".to_string(),
            queue: QueueSummary {
                counts,
                total: counts.total(),
            },
            pending_by_priority,
            success_rate: success_rate(&counts),
            last_dispatch_at,
            services,
            routing_rules: self.routing_rules,
            uptime_seconds: self.liveness.uptime_seconds(now),
            timestamp: now,
        })
    }
}

/// `completed / total * 100` rounded to two decimals; 100 for an empty queue
pub fn success_rate(counts: &QueueCounts) -> f64 {
    let total = counts.total();
    if total == 0 {
        return 100.0;
    }
    let rate = counts.completed as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::event::{
        EventQueueItem, Priority, QueueStatus, ServiceHealthRecord,
    };
    use crate::repositories::{
        MockAuditLogRepository, MockDispatchTargetRepository, MockEventQueueRepository,
    };
    use crate::services::audit::AuditServiceConfig;
    use crate::services::clock::{FixedClock, InstanceLiveness};
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use uuid::Uuid;

    fn caller() -> TokenVerification {
        TokenVerification {
            service_id: ServiceId::MinuKeep,
            client_id: "dashboard".to_string(),
            scope: vec!["events:read".to_string()],
            expires_at: Utc::now(),
            remaining_seconds: 900,
            token_id: Uuid::new_v4(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    fn health(service: &str, status: &str) -> ServiceHealthRecord {
        ServiceHealthRecord {
            id: Uuid::new_v4(),
            service_name: service.to_string(),
            status: status.to_string(),
            response_time_ms: None,
            error_rate: None,
            cpu_usage: None,
            memory_usage: None,
            details: json!({}),
            last_check_at: Utc::now(),
        }
    }

    #[test]
    fn test_success_rate_rounding() {
        assert_eq!(success_rate(&QueueCounts::default()), 100.0);

        let counts = QueueCounts {
            pending: 1,
            processing: 0,
            completed: 2,
            failed: 0,
        };
        assert_eq!(success_rate(&counts), 66.67);
    }

    #[test]
    fn test_connectivity_mapping() {
        assert_eq!(Connectivity::from_health_status("healthy"), Connectivity::Connected);
        assert_eq!(Connectivity::from_health_status("Degraded"), Connectivity::Degraded);
        assert_eq!(Connectivity::from_health_status("unhealthy"), Connectivity::Disconnected);
        assert_eq!(Connectivity::from_health_status(""), Connectivity::Disconnected);
    }

    #[tokio::test]
    async fn test_report_aggregates_state() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));
        let queue = MockEventQueueRepository::new();
        let targets = MockDispatchTargetRepository::new();
        let audit_repo = MockAuditLogRepository::new();

        let items = [
            (Priority::Critical, QueueStatus::Pending),
            (Priority::Low, QueueStatus::Pending),
            (Priority::Normal, QueueStatus::Completed),
            (Priority::Normal, QueueStatus::Failed),
        ];
        for (i, (priority, status)) in items.into_iter().enumerate() {
            let item = EventQueueItem::new(
                "user.signup",
                "minu-frame",
                json!({}),
                priority,
                start + Duration::seconds(i as i64),
            )
            .with_status(status);
            queue.seed(item).await;
        }

        targets.upsert_service_health(&health("minu-find", "healthy")).await.unwrap();
        targets.upsert_service_health(&health("minu-build", "degraded")).await.unwrap();

        let reporter = StatusReporter::new(
            Arc::new(queue),
            Arc::new(targets),
            Arc::new(InstanceLiveness::new(start)),
            Arc::new(AuditService::new(
                Arc::new(audit_repo.clone()),
                clock.clone(),
                AuditServiceConfig::default(),
            )),
            clock.clone(),
            5,
        );

        clock.advance(Duration::seconds(3600));
        let status = reporter
            .report(&caller(), &RequestContext::new("GET", "/mcp-router/status"))
            .await
            .unwrap();

        assert_eq!(status.status, "operational");
        assert_eq!(status.queue.total, 4);
        assert_eq!(status.queue.counts.pending, 2);
        assert_eq!(status.pending_by_priority.critical, 1);
        assert_eq!(status.pending_by_priority.low, 1);
        assert_eq!(status.pending_by_priority.normal, 0);
        assert_eq!(status.success_rate, 25.0);
        assert_eq!(status.last_dispatch_at, Some(start + Duration::seconds(3)));
        assert_eq!(status.uptime_seconds, 3600);
        assert_eq!(status.routing_rules, 5);
        assert_eq!(status.services["minu-find"], Connectivity::Connected);
        assert_eq!(status.services["minu-build"], Connectivity::Degraded);
        assert_eq!(status.services["minu-keep"], Connectivity::Disconnected);

        let logs = audit_repo.get_all_logs().await;
        assert_eq!(logs[0].event_type, AuditEventType::StatusRead);
    }
}
