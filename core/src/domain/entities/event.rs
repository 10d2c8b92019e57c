//! Event routing entities: envelopes, queue items and dispatch target records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Event priority. Ordered `Low < Normal < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Normal,
        Priority::Low,
    ];

    fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 3,
            Priority::High => 2,
            Priority::Normal => 1,
            Priority::Low => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    /// Advisory delivery delay reported back to callers
    pub fn delivery_delay_ms(&self) -> i64 {
        match self {
            Priority::Critical => 0,
            Priority::High => 100,
            Priority::Normal => 500,
            Priority::Low => 1000,
        }
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// Processing state of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
        }
    }
}

impl FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QueueStatus::Pending),
            "processing" => Ok(QueueStatus::Processing),
            "completed" => Ok(QueueStatus::Completed),
            "failed" => Ok(QueueStatus::Failed),
            _ => Err(format!("Unknown queue status: {}", s)),
        }
    }
}

/// Inbound event as posted to `/mcp-router/dispatch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_type: String,
    pub source_service: String,
    #[serde(default)]
    pub target_service: Option<String>,
    #[serde(default)]
    pub payload: JsonValue,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub metadata: Option<JsonValue>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl EventEnvelope {
    pub fn new(
        event_type: impl Into<String>,
        source_service: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            source_service: source_service.into(),
            target_service: None,
            payload,
            priority: None,
            metadata: None,
            idempotency_key: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority.as_str().to_string());
        self
    }

    pub fn with_target(mut self, target_service: impl Into<String>) -> Self {
        self.target_service = Some(target_service.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// String field of the payload, if present and non-empty
    pub fn payload_str(&self, field: &str) -> Option<String> {
        self.payload
            .get(field)
            .and_then(JsonValue::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    }

    pub fn payload_f64(&self, field: &str) -> Option<f64> {
        self.payload.get(field).and_then(JsonValue::as_f64)
    }

    pub fn payload_i64(&self, field: &str) -> Option<i64> {
        self.payload.get(field).and_then(JsonValue::as_i64)
    }
}

/// Row of `mcp_event_queue`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventQueueItem {
    pub id: Uuid,
    pub event_type: String,
    pub source_service: String,
    /// `*` addresses every service
    pub target_service: Option<String>,
    pub payload: JsonValue,
    pub priority: Priority,
    pub status: QueueStatus,
    pub retry_count: u32,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl EventQueueItem {
    pub fn new(
        event_type: impl Into<String>,
        source_service: impl Into<String>,
        payload: JsonValue,
        priority: Priority,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            source_service: source_service.into(),
            target_service: None,
            payload,
            priority,
            status: QueueStatus::Pending,
            retry_count: 0,
            idempotency_key: None,
            created_at,
            processed_at: None,
            error_message: None,
        }
    }

    pub fn with_target(mut self, target_service: Option<String>) -> Self {
        self.target_service = target_service;
        self
    }

    pub fn with_status(mut self, status: QueueStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_idempotency_key(mut self, key: Option<String>) -> Self {
        self.idempotency_key = key;
        self
    }
}

/// Result of an idempotent queue insert
#[derive(Debug, Clone, PartialEq)]
pub enum QueueInsert {
    /// The item was stored
    Inserted,
    /// Another item already holds the idempotency key
    Existing(EventQueueItem),
}

/// Where a routed event is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchTarget {
    ServiceHealth,
    ServiceIssues,
    ServiceEvents,
    Notifications,
    EventQueue,
}

impl DispatchTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchTarget::ServiceHealth => "service_health",
            DispatchTarget::ServiceIssues => "service_issues",
            DispatchTarget::ServiceEvents => "service_events",
            DispatchTarget::Notifications => "notifications",
            DispatchTarget::EventQueue => "event_queue",
        }
    }
}

impl fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of `service_health`, one per service (upserted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealthRecord {
    pub id: Uuid,
    pub service_name: String,
    /// `healthy`, `degraded`, `unhealthy` or anything the service reports
    pub status: String,
    pub response_time_ms: Option<i64>,
    pub error_rate: Option<f64>,
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub details: JsonValue,
    pub last_check_at: DateTime<Utc>,
}

/// Row of `service_issues`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceIssueRecord {
    pub id: Uuid,
    pub service_name: String,
    pub issue_type: String,
    pub severity: String,
    pub title: String,
    pub description: Option<String>,
    pub details: JsonValue,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Row of `service_events`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEventRecord {
    pub id: Uuid,
    pub service_name: String,
    pub event_type: String,
    pub target_service: Option<String>,
    pub payload: JsonValue,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

/// Notification content before it is fanned out to recipients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub priority: Priority,
    pub data: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl NotificationDraft {
    /// Concrete row for one recipient
    pub fn for_user(&self, user_id: impl Into<String>) -> NotificationRecord {
        NotificationRecord {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: self.title.clone(),
            message: self.message.clone(),
            notification_type: self.notification_type.clone(),
            priority: self.priority,
            data: self.data.clone(),
            is_read: false,
            created_at: self.created_at,
        }
    }
}

/// Row of `notifications`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub priority: Priority,
    pub data: JsonValue,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Target-shaped output of a routing transform
#[derive(Debug, Clone, PartialEq)]
pub enum TransformedEvent {
    Health(ServiceHealthRecord),
    Issue(ServiceIssueRecord),
    ServiceEvent(ServiceEventRecord),
    Notification(NotificationDraft),
    Queue(JsonValue),
}

impl TransformedEvent {
    /// JSON form stored on queue items claimed for idempotency
    pub fn to_json(&self) -> JsonValue {
        let value = match self {
            TransformedEvent::Health(r) => serde_json::to_value(r),
            TransformedEvent::Issue(r) => serde_json::to_value(r),
            TransformedEvent::ServiceEvent(r) => serde_json::to_value(r),
            TransformedEvent::Notification(r) => serde_json::to_value(r),
            TransformedEvent::Queue(v) => Ok(v.clone()),
        };
        value.unwrap_or(JsonValue::Null)
    }

    /// Identifier of the primary record, if the target creates one
    pub fn record_id(&self) -> Option<Uuid> {
        match self {
            TransformedEvent::Health(r) => Some(r.id),
            TransformedEvent::Issue(r) => Some(r.id),
            TransformedEvent::ServiceEvent(r) => Some(r.id),
            TransformedEvent::Notification(_) | TransformedEvent::Queue(_) => None,
        }
    }
}

/// Queue item counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

impl QueueCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.processing + self.completed + self.failed
    }

    pub fn add(&mut self, status: QueueStatus, count: u64) {
        match status {
            QueueStatus::Pending => self.pending += count,
            QueueStatus::Processing => self.processing += count,
            QueueStatus::Completed => self.completed += count,
            QueueStatus::Failed => self.failed += count,
        }
    }
}

/// Pending queue item counts by priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub critical: u64,
    pub high: u64,
    pub normal: u64,
    pub low: u64,
}

impl PriorityCounts {
    pub fn add(&mut self, priority: Priority, count: u64) {
        match priority {
            Priority::Critical => self.critical += count,
            Priority::High => self.high += count,
            Priority::Normal => self.normal += count,
            Priority::Low => self.low += count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert!(Priority::High >= Priority::High);

        let mut sorted = vec![Priority::Low, Priority::Critical, Priority::Normal, Priority::High];
        sorted.sort();
        assert_eq!(
            sorted,
            vec![Priority::Low, Priority::Normal, Priority::High, Priority::Critical]
        );
    }

    #[test]
    fn test_priority_delays() {
        let delays: Vec<i64> = Priority::ALL.iter().map(Priority::delivery_delay_ms).collect();
        assert_eq!(delays, vec![0, 100, 500, 1000]);
        assert_eq!(Priority::default(), Priority::Normal);
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_queue_counts_total() {
        let mut counts = QueueCounts::default();
        counts.add(QueueStatus::Completed, 3);
        counts.add(QueueStatus::Failed, 1);
        counts.add(QueueStatus::Pending, 2);
        assert_eq!(counts.total(), 6);
        assert_eq!(counts.completed, 3);
    }

    #[test]
    fn test_notification_fan_out_row() {
        let draft = NotificationDraft {
            title: "Service down".into(),
            message: "minu-keep is unhealthy".into(),
            notification_type: "system_alert".into(),
            priority: Priority::Critical,
            data: serde_json::json!({"service": "minu-keep"}),
            created_at: Utc::now(),
        };

        let a = draft.for_user("admin-1");
        let b = draft.for_user("admin-2");
        assert_ne!(a.id, b.id);
        assert_eq!(a.title, b.title);
        assert_eq!(b.user_id, "admin-2");
        assert!(!a.is_read);
    }

    #[test]
    fn test_envelope_payload_accessors() {
        let envelope = EventEnvelope::new(
            "service.health.report",
            "minu-find",
            serde_json::json!({"status": "healthy", "response_time_ms": 42, "title": "  "}),
        );
        assert_eq!(envelope.payload_str("status").as_deref(), Some("healthy"));
        assert_eq!(envelope.payload_i64("response_time_ms"), Some(42));
        assert_eq!(envelope.payload_str("title"), None);
    }
}
