//! Repository trait for the tables routed events are written to.

use async_trait::async_trait;

use crate::domain::entities::event::{
    NotificationRecord, ServiceEventRecord, ServiceHealthRecord, ServiceIssueRecord,
};
use crate::errors::DomainError;

/// Writes to `service_health`, `service_issues`, `service_events` and
/// `notifications`, plus the admin lookup on `profiles` used for fan-out
#[async_trait]
pub trait DispatchTargetRepository: Send + Sync {
    /// Insert or replace the health row of `record.service_name`
    async fn upsert_service_health(&self, record: &ServiceHealthRecord) -> Result<(), DomainError>;

    async fn insert_service_issue(&self, record: &ServiceIssueRecord) -> Result<(), DomainError>;

    async fn insert_service_event(&self, record: &ServiceEventRecord) -> Result<(), DomainError>;

    /// Ids of every profile with the admin role
    async fn admin_user_ids(&self) -> Result<Vec<String>, DomainError>;

    /// Insert notification rows in one batch
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of rows inserted
    async fn insert_notifications(&self, records: &[NotificationRecord]) -> Result<usize, DomainError>;

    /// Freshest health row per service
    async fn latest_health_by_service(&self) -> Result<Vec<ServiceHealthRecord>, DomainError>;
}
