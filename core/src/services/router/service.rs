//! Event router service

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::audit::{AuditEventType, RequestContext};
use crate::domain::entities::event::{
    DispatchTarget, EventEnvelope, EventQueueItem, NotificationDraft, Priority, QueueInsert,
    QueueStatus, TransformedEvent,
};
use crate::domain::entities::token::{RetryPolicy, TokenVerification};
use crate::errors::{DispatchError, DomainError};
use crate::repositories::{DispatchTargetRepository, EventQueueRepository};
use crate::services::audit::AuditService;
use crate::services::clock::Clock;

use super::rules::{RoutingRule, RoutingTable};
use super::transform;

/// State reported for a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    /// Waiting in the generic queue
    Queued,
    /// Written to its target table
    Processed,
    /// Claimed by a dispatch that has not finished
    Processing,
    Failed,
}

impl From<QueueStatus> for DispatchStatus {
    fn from(status: QueueStatus) -> Self {
        match status {
            QueueStatus::Pending => DispatchStatus::Queued,
            QueueStatus::Processing => DispatchStatus::Processing,
            QueueStatus::Completed => DispatchStatus::Processed,
            QueueStatus::Failed => DispatchStatus::Failed,
        }
    }
}

/// Response of an accepted dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    pub dispatched: bool,
    pub dispatch_id: Uuid,
    pub status: DispatchStatus,
    pub rule: String,
    pub target: DispatchTarget,
    /// Advisory only
    pub estimated_delivery: DateTime<Utc>,
    pub retry_policy: RetryPolicy,
    /// The idempotency key was already used; nothing was written
    pub duplicate: bool,
}

/// Routes authenticated events to their target tables
pub struct EventRouter {
    queue: Arc<dyn EventQueueRepository>,
    targets: Arc<dyn DispatchTargetRepository>,
    rules: RoutingTable,
    audit: Arc<AuditService>,
    clock: Arc<dyn Clock>,
}

impl EventRouter {
    pub fn new(
        queue: Arc<dyn EventQueueRepository>,
        targets: Arc<dyn DispatchTargetRepository>,
        rules: RoutingTable,
        audit: Arc<AuditService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            queue,
            targets,
            rules,
            audit,
            clock,
        }
    }

    /// Dispatches one event
    ///
    /// # Arguments
    ///
    /// * `envelope` - The inbound event
    /// * `header_key` - `X-Idempotency-Key`, preferred over the body field
    /// * `caller` - Verified identity of the sending service
    /// * `ctx` - Request metadata for auditing
    ///
    /// # Returns
    ///
    /// * `Ok(DispatchReceipt)` - Written, queued, or a duplicate of an earlier dispatch
    /// * `Err(DispatchError)` - Invalid envelope or a failed target write
    pub async fn dispatch(
        &self,
        envelope: EventEnvelope,
        header_key: Option<&str>,
        caller: &TokenVerification,
        ctx: &RequestContext,
    ) -> Result<DispatchReceipt, DomainError> {
        let event_type = envelope.event_type.clone();
        let result = self.dispatch_inner(envelope, header_key, caller).await;

        let details = match &result {
            Ok(receipt) => serde_json::json!({
                "event_type": event_type,
                "dispatch_id": receipt.dispatch_id,
                "rule": receipt.rule,
                "target": receipt.target,
                "duplicate": receipt.duplicate,
            }),
            Err(_) => serde_json::json!({ "event_type": event_type }),
        };
        self.audit
            .record_outcome(
                ctx,
                AuditEventType::EventDispatched,
                AuditEventType::EventDispatchFailure,
                Some(caller.service_id.to_string()),
                Some(caller.client_id.clone()),
                &result,
                Some(details),
            )
            .await;

        result
    }

    async fn dispatch_inner(
        &self,
        envelope: EventEnvelope,
        header_key: Option<&str>,
        caller: &TokenVerification,
    ) -> Result<DispatchReceipt, DomainError> {
        let priority = validate(&envelope)?;
        let key = header_key
            .or(envelope.idempotency_key.as_deref())
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        if key.as_ref().is_some_and(|k| k.len() > MAX_IDEMPOTENCY_KEY_LEN) {
            return Err(DispatchError::InvalidPayload {
                reason: format!(
                    "idempotency key exceeds {} characters",
                    MAX_IDEMPOTENCY_KEY_LEN
                ),
            }
            .into());
        }

        if envelope.source_service != caller.service_id.as_str() {
            tracing::warn!(
                caller = %caller.service_id,
                source_service = %envelope.source_service,
                event_type = %envelope.event_type,
                "Event source does not match the authenticated service"
            );
        }

        let rule = self
            .rules
            .match_event(&envelope.event_type)
            .ok_or_else(|| DispatchError::NoMatchingRule {
                event_type: envelope.event_type.clone(),
            })?;

        let now = self.clock.now();
        let transformed = (rule.transform)(&envelope, priority, now);

        match transformed {
            TransformedEvent::Queue(payload) => {
                self.enqueue(&envelope, rule, priority, payload, key, now)
                    .await
            }
            direct => {
                self.deliver(&envelope, rule, priority, direct, key, now)
                    .await
            }
        }
    }

    /// Generic queue path: the queue row itself is the idempotency claim
    async fn enqueue(
        &self,
        envelope: &EventEnvelope,
        rule: &RoutingRule,
        priority: Priority,
        payload: serde_json::Value,
        key: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DispatchReceipt, DomainError> {
        let item = EventQueueItem::new(
            envelope.event_type.clone(),
            envelope.source_service.clone(),
            payload,
            priority,
            now,
        )
        .with_target(envelope.target_service.clone())
        .with_idempotency_key(key);

        let dispatch_id = match self
            .queue
            .insert_if_absent(&item)
            .await
            .map_err(|e| dispatch_failed(rule.target, e))?
        {
            QueueInsert::Inserted => item.id,
            QueueInsert::Existing(existing) => {
                if !self.reclaim(&existing, QueueStatus::Pending, rule).await? {
                    return Ok(self.duplicate_receipt(&existing, now));
                }
                existing.id
            }
        };

        if rule.should_notify(priority) {
            self.notify_admins(&transform::alert(envelope, priority, now))
                .await
                .map_err(|e| dispatch_failed(rule.target, e))?;
        }

        tracing::info!(
            dispatch_id = %dispatch_id,
            event_type = %envelope.event_type,
            rule = %rule.name,
            "Queued event"
        );
        Ok(receipt(dispatch_id, DispatchStatus::Queued, rule, priority, now))
    }

    /// Direct table path, claiming a queue item first when a key is supplied
    async fn deliver(
        &self,
        envelope: &EventEnvelope,
        rule: &RoutingRule,
        priority: Priority,
        transformed: TransformedEvent,
        key: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DispatchReceipt, DomainError> {
        let claim = match key {
            None => None,
            Some(key) => {
                let item = EventQueueItem::new(
                    envelope.event_type.clone(),
                    envelope.source_service.clone(),
                    transformed.to_json(),
                    priority,
                    now,
                )
                .with_target(envelope.target_service.clone())
                .with_status(QueueStatus::Processing)
                .with_idempotency_key(Some(key));

                match self
                    .queue
                    .insert_if_absent(&item)
                    .await
                    .map_err(|e| dispatch_failed(rule.target, e))?
                {
                    QueueInsert::Inserted => Some(item.id),
                    QueueInsert::Existing(existing) => {
                        if !self.reclaim(&existing, QueueStatus::Processing, rule).await? {
                            return Ok(self.duplicate_receipt(&existing, now));
                        }
                        Some(existing.id)
                    }
                }
            }
        };

        let record_id = transformed.record_id();
        match self.write(envelope, rule, priority, transformed, now).await {
            Ok(()) => {
                if let Some(id) = claim {
                    // The target row exists; the claim stays processing so retries report a duplicate
                    if let Err(e) = self.queue.mark_completed(id, now).await {
                        tracing::error!(dispatch_id = %id, error = %e, "Failed to mark dispatch completed");
                        return Err(dispatch_failed(rule.target, e));
                    }
                }

                let dispatch_id = claim.or(record_id).unwrap_or_else(Uuid::new_v4);
                tracing::info!(
                    dispatch_id = %dispatch_id,
                    event_type = %envelope.event_type,
                    rule = %rule.name,
                    dispatch_target = %rule.target,
                    "Dispatched event"
                );
                Ok(receipt(dispatch_id, DispatchStatus::Processed, rule, priority, now))
            }
            Err(error) => {
                if let Some(id) = claim {
                    if let Err(e) = self.queue.mark_failed(id, &error.to_string(), now).await {
                        tracing::error!(dispatch_id = %id, error = %e, "Failed to mark dispatch failed");
                    }
                }
                Err(error)
            }
        }
    }

    /// Primary target write followed by the conditional admin alert
    async fn write(
        &self,
        envelope: &EventEnvelope,
        rule: &RoutingRule,
        priority: Priority,
        transformed: TransformedEvent,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let written = match &transformed {
            TransformedEvent::Health(record) => self.targets.upsert_service_health(record).await,
            TransformedEvent::Issue(record) => self.targets.insert_service_issue(record).await,
            TransformedEvent::ServiceEvent(record) => self.targets.insert_service_event(record).await,
            TransformedEvent::Notification(draft) => self.notify_admins(draft).await.map(|_| ()),
            TransformedEvent::Queue(_) => Err(DomainError::internal(
                "Queue payload routed to a table target",
            )),
        };
        written.map_err(|e| dispatch_failed(rule.target, e))?;

        if rule.should_notify(priority) {
            self.notify_admins(&transform::alert(envelope, priority, now))
                .await
                .map_err(|e| dispatch_failed(DispatchTarget::Notifications, e))?;
        }
        Ok(())
    }

    /// Fan a notification out to every admin
    async fn notify_admins(&self, draft: &NotificationDraft) -> Result<usize, DomainError> {
        let admins = self.targets.admin_user_ids().await?;
        if admins.is_empty() {
            tracing::warn!(title = %draft.title, "No admin recipients for notification");
            return Ok(0);
        }

        let records: Vec<_> = admins.iter().map(|id| draft.for_user(id.as_str())).collect();
        self.targets.insert_notifications(&records).await
    }

    /// Take over a failed item so the same key can be re-driven
    async fn reclaim(
        &self,
        existing: &EventQueueItem,
        status: QueueStatus,
        rule: &RoutingRule,
    ) -> Result<bool, DomainError> {
        if existing.status != QueueStatus::Failed {
            return Ok(false);
        }
        let reclaimed = self
            .queue
            .reclaim_failed(existing.id, status)
            .await
            .map_err(|e| dispatch_failed(rule.target, e))?;
        if reclaimed {
            tracing::info!(
                dispatch_id = %existing.id,
                retry_count = existing.retry_count + 1,
                "Re-driving failed dispatch"
            );
        }
        Ok(reclaimed)
    }

    fn duplicate_receipt(&self, existing: &EventQueueItem, now: DateTime<Utc>) -> DispatchReceipt {
        tracing::debug!(dispatch_id = %existing.id, "Duplicate idempotency key");

        let (rule, target) = match self.rules.match_event(&existing.event_type) {
            Some(rule) => (rule.name.clone(), rule.target),
            None => (String::new(), DispatchTarget::EventQueue),
        };
        DispatchReceipt {
            dispatched: true,
            dispatch_id: existing.id,
            status: existing.status.into(),
            rule,
            target,
            estimated_delivery: now + Duration::milliseconds(existing.priority.delivery_delay_ms()),
            retry_policy: RetryPolicy::default(),
            duplicate: true,
        }
    }
}

/// Reject envelopes the router cannot route, before any write
/// Column widths of the event queue
const MAX_SERVICE_NAME_LEN: usize = 64;
const MAX_EVENT_TYPE_LEN: usize = 255;
const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

fn validate(envelope: &EventEnvelope) -> Result<Priority, DomainError> {
    let invalid = |reason: &str| DispatchError::InvalidPayload {
        reason: reason.to_string(),
    };
    let too_long = |field: &str, max: usize| DispatchError::InvalidPayload {
        reason: format!("{} exceeds {} characters", field, max),
    };

    if envelope.event_type.trim().is_empty() {
        return Err(invalid("event_type is required").into());
    }
    if envelope.event_type.len() > MAX_EVENT_TYPE_LEN {
        return Err(too_long("event_type", MAX_EVENT_TYPE_LEN).into());
    }
    if envelope.source_service.trim().is_empty() {
        return Err(invalid("source_service is required").into());
    }
    if envelope.source_service.len() > MAX_SERVICE_NAME_LEN {
        return Err(too_long("source_service", MAX_SERVICE_NAME_LEN).into());
    }
    if envelope
        .target_service
        .as_ref()
        .is_some_and(|t| t.len() > MAX_SERVICE_NAME_LEN)
    {
        return Err(too_long("target_service", MAX_SERVICE_NAME_LEN).into());
    }
    if !envelope.payload.is_object() {
        return Err(invalid("payload must be a JSON object").into());
    }

    match envelope.priority.as_deref() {
        None => Ok(Priority::default()),
        Some(raw) => raw
            .parse::<Priority>()
            .map_err(|reason| DispatchError::InvalidPayload { reason }.into()),
    }
}

fn receipt(
    dispatch_id: Uuid,
    status: DispatchStatus,
    rule: &RoutingRule,
    priority: Priority,
    now: DateTime<Utc>,
) -> DispatchReceipt {
    DispatchReceipt {
        dispatched: true,
        dispatch_id,
        status,
        rule: rule.name.clone(),
        target: rule.target,
        estimated_delivery: now + Duration::milliseconds(priority.delivery_delay_ms()),
        retry_policy: RetryPolicy::default(),
        duplicate: false,
    }
}

fn dispatch_failed(target: DispatchTarget, error: DomainError) -> DomainError {
    tracing::error!(dispatch_target = %target, error = %error, "Dispatch write failed");
    DispatchError::DispatchFailed {
        target: target.to_string(),
        reason: error.to_string(),
    }
    .into()
}
