//! Pure payload transforms, one per dispatch target.
//!
//! Each function maps an inbound envelope to the record its target stores.
//! None of them touch storage or the clock.

use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::domain::entities::event::{
    EventEnvelope, NotificationDraft, Priority, ServiceEventRecord, ServiceHealthRecord,
    ServiceIssueRecord, TransformedEvent,
};

/// `notification_type` of admin alerts raised by routing rules
pub const ALERT_NOTIFICATION_TYPE: &str = "service_alert";

// Widths of the target columns fed from payload fields
const STATUS_WIDTH: usize = 32;
const ISSUE_TYPE_WIDTH: usize = 128;
const NOTIFICATION_TYPE_WIDTH: usize = 64;
const TITLE_WIDTH: usize = 512;

/// Truncates to at most `max` bytes on a char boundary
fn clip(mut value: String, max: usize) -> String {
    if value.len() > max {
        let mut end = max;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        value.truncate(end);
    }
    value
}

pub fn to_health(envelope: &EventEnvelope, _priority: Priority, now: DateTime<Utc>) -> TransformedEvent {
    TransformedEvent::Health(ServiceHealthRecord {
        id: Uuid::new_v4(),
        service_name: envelope.source_service.clone(),
        status: clip(
            envelope
                .payload_str("status")
                .unwrap_or_else(|| "unknown".to_string()),
            STATUS_WIDTH,
        ),
        response_time_ms: envelope.payload_i64("response_time_ms"),
        error_rate: envelope.payload_f64("error_rate"),
        cpu_usage: envelope.payload_f64("cpu_usage"),
        memory_usage: envelope.payload_f64("memory_usage"),
        details: envelope
            .payload
            .get("details")
            .cloned()
            .unwrap_or_else(|| envelope.payload.clone()),
        last_check_at: now,
    })
}

/// Issue type is the event type suffix, e.g. `crash` for `service.issue.crash`
pub fn to_issue(envelope: &EventEnvelope, priority: Priority, now: DateTime<Utc>) -> TransformedEvent {
    let issue_type = envelope
        .event_type
        .strip_prefix("service.issue.")
        .filter(|s| !s.is_empty())
        .unwrap_or("general")
        .to_string();

    TransformedEvent::Issue(ServiceIssueRecord {
        id: Uuid::new_v4(),
        service_name: envelope.source_service.clone(),
        issue_type: clip(issue_type, ISSUE_TYPE_WIDTH),
        severity: clip(
            envelope
                .payload_str("severity")
                .unwrap_or_else(|| priority.as_str().to_string()),
            STATUS_WIDTH,
        ),
        title: clip(
            envelope
                .payload_str("title")
                .unwrap_or_else(|| envelope.event_type.clone()),
            TITLE_WIDTH,
        ),
        description: envelope
            .payload_str("description")
            .or_else(|| envelope.payload_str("message")),
        details: envelope.payload.clone(),
        status: "open".to_string(),
        created_at: now,
    })
}

pub fn to_service_event(envelope: &EventEnvelope, priority: Priority, now: DateTime<Utc>) -> TransformedEvent {
    TransformedEvent::ServiceEvent(ServiceEventRecord {
        id: Uuid::new_v4(),
        service_name: envelope.source_service.clone(),
        event_type: envelope.event_type.clone(),
        target_service: envelope.target_service.clone(),
        payload: envelope.payload.clone(),
        priority,
        created_at: now,
    })
}

pub fn to_notification(envelope: &EventEnvelope, priority: Priority, now: DateTime<Utc>) -> TransformedEvent {
    let notification_type = envelope
        .payload_str("type")
        .or_else(|| {
            envelope
                .event_type
                .strip_prefix("notification.")
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "info".to_string());

    TransformedEvent::Notification(NotificationDraft {
        title: clip(
            envelope
                .payload_str("title")
                .unwrap_or_else(|| envelope.event_type.clone()),
            TITLE_WIDTH,
        ),
        message: envelope.payload_str("message").unwrap_or_default(),
        notification_type: clip(notification_type, NOTIFICATION_TYPE_WIDTH),
        priority,
        data: event_data(envelope),
        created_at: now,
    })
}

/// Generic queue payload: the original data plus caller metadata
pub fn to_queue(envelope: &EventEnvelope, _priority: Priority, _now: DateTime<Utc>) -> TransformedEvent {
    TransformedEvent::Queue(json!({
        "data": envelope.payload,
        "metadata": envelope.metadata.clone().unwrap_or(JsonValue::Null),
    }))
}

/// Admin alert raised when a rule's notification threshold is met
pub fn alert(envelope: &EventEnvelope, priority: Priority, now: DateTime<Utc>) -> NotificationDraft {
    let message = envelope
        .payload_str("message")
        .or_else(|| envelope.payload_str("description"))
        .unwrap_or_else(|| {
            format!(
                "{} reported {}",
                envelope.source_service, envelope.event_type
            )
        });

    NotificationDraft {
        title: format!(
            "[{}] {}",
            priority.as_str().to_uppercase(),
            envelope.event_type
        ),
        message,
        notification_type: ALERT_NOTIFICATION_TYPE.to_string(),
        priority,
        data: event_data(envelope),
        created_at: now,
    }
}

fn event_data(envelope: &EventEnvelope) -> JsonValue {
    json!({
        "source_service": envelope.source_service,
        "event_type": envelope.event_type,
        "target_service": envelope.target_service,
        "payload": envelope.payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_health_defaults_status() {
        let envelope = EventEnvelope::new(
            "service.health.report",
            "minu-find",
            json!({"response_time_ms": 120, "cpu_usage": 0.4}),
        );
        match to_health(&envelope, Priority::Normal, now()) {
            TransformedEvent::Health(record) => {
                assert_eq!(record.service_name, "minu-find");
                assert_eq!(record.status, "unknown");
                assert_eq!(record.response_time_ms, Some(120));
                assert_eq!(record.cpu_usage, Some(0.4));
                assert_eq!(record.error_rate, None);
            }
            other => panic!("unexpected transform: {:?}", other),
        }
    }

    #[test]
    fn test_payload_fields_are_clipped_to_column_width() {
        let envelope = EventEnvelope::new(
            format!("service.issue.{}", "x".repeat(200)),
            "minu-find",
            json!({"severity": "s".repeat(40), "title": "é".repeat(300)}),
        );
        match to_issue(&envelope, Priority::Normal, now()) {
            TransformedEvent::Issue(record) => {
                assert_eq!(record.issue_type.len(), 128);
                assert_eq!(record.severity.len(), 32);
                // Two-byte chars are never split
                assert_eq!(record.title.len(), 512);
                assert_eq!(record.title.chars().count(), 256);
            }
            other => panic!("unexpected transform: {:?}", other),
        }

        let envelope = EventEnvelope::new(
            "service.health.report",
            "minu-find",
            json!({"status": "degraded-but-this-is-far-too-long-for-the-column"}),
        );
        match to_health(&envelope, Priority::Normal, now()) {
            TransformedEvent::Health(record) => assert_eq!(record.status.len(), 32),
            other => panic!("unexpected transform: {:?}", other),
        }
    }

    #[test]
    fn test_issue_fields_from_event() {
        let envelope = EventEnvelope::new(
            "service.issue.crash",
            "minu-build",
            json!({"message": "worker exited"}),
        );
        match to_issue(&envelope, Priority::High, now()) {
            TransformedEvent::Issue(record) => {
                assert_eq!(record.issue_type, "crash");
                assert_eq!(record.severity, "high");
                assert_eq!(record.title, "service.issue.crash");
                assert_eq!(record.description.as_deref(), Some("worker exited"));
                assert_eq!(record.status, "open");
            }
            other => panic!("unexpected transform: {:?}", other),
        }

        let envelope = EventEnvelope::new(
            "service.issue",
            "minu-build",
            json!({"severity": "critical", "title": "Disk full"}),
        );
        match to_issue(&envelope, Priority::Low, now()) {
            TransformedEvent::Issue(record) => {
                assert_eq!(record.issue_type, "general");
                assert_eq!(record.severity, "critical");
                assert_eq!(record.title, "Disk full");
            }
            other => panic!("unexpected transform: {:?}", other),
        }
    }

    #[test]
    fn test_notification_type_from_suffix() {
        let envelope = EventEnvelope::new(
            "notification.maintenance",
            "minu-keep",
            json!({"title": "Backup window", "message": "Tonight at 2am"}),
        );
        match to_notification(&envelope, Priority::Normal, now()) {
            TransformedEvent::Notification(draft) => {
                assert_eq!(draft.notification_type, "maintenance");
                assert_eq!(draft.title, "Backup window");
                assert_eq!(draft.data["source_service"], "minu-keep");
            }
            other => panic!("unexpected transform: {:?}", other),
        }
    }

    #[test]
    fn test_queue_wraps_data_and_metadata() {
        let mut envelope = EventEnvelope::new("user.signup", "minu-frame", json!({"user": 7}));
        envelope.metadata = Some(json!({"trace": "abc"}));

        let transformed = to_queue(&envelope, Priority::Low, now());
        assert_eq!(
            transformed.to_json(),
            json!({"data": {"user": 7}, "metadata": {"trace": "abc"}})
        );
    }

    #[test]
    fn test_alert_title_carries_priority() {
        let envelope = EventEnvelope::new("service.health.down", "minu-find", json!({}));
        let draft = alert(&envelope, Priority::Critical, now());
        assert_eq!(draft.title, "[CRITICAL] service.health.down");
        assert_eq!(draft.message, "minu-find reported service.health.down");
        assert_eq!(draft.notification_type, ALERT_NOTIFICATION_TYPE);
    }
}
