//! In-memory implementation of DispatchTargetRepository

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::event::{
    NotificationRecord, ServiceEventRecord, ServiceHealthRecord, ServiceIssueRecord,
};
use crate::errors::DomainError;

use super::DispatchTargetRepository;

#[derive(Default)]
struct Tables {
    health: HashMap<String, ServiceHealthRecord>,
    issues: Vec<ServiceIssueRecord>,
    events: Vec<ServiceEventRecord>,
    notifications: Vec<NotificationRecord>,
    admins: Vec<String>,
}

/// Mock dispatch targets for tests and `MCP_STORAGE=memory`
#[derive(Clone, Default)]
pub struct MockDispatchTargetRepository {
    tables: Arc<RwLock<Tables>>,
    should_fail: Arc<AtomicBool>,
    fail_notifications: Arc<AtomicBool>,
}

impl MockDispatchTargetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository with the given admin profile ids
    pub fn with_admins<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tables = Tables {
            admins: admins.into_iter().map(Into::into).collect(),
            ..Default::default()
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
            ..Default::default()
        }
    }

    /// Make every write fail
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Make only notification inserts fail
    pub fn set_fail_notifications(&self, fail: bool) {
        self.fail_notifications.store(fail, Ordering::SeqCst);
    }

    pub async fn health_rows(&self) -> Vec<ServiceHealthRecord> {
        self.tables.read().await.health.values().cloned().collect()
    }

    pub async fn issues(&self) -> Vec<ServiceIssueRecord> {
        self.tables.read().await.issues.clone()
    }

    pub async fn events(&self) -> Vec<ServiceEventRecord> {
        self.tables.read().await.events.clone()
    }

    pub async fn notifications(&self) -> Vec<NotificationRecord> {
        self.tables.read().await.notifications.clone()
    }

    fn check_failure(&self) -> Result<(), DomainError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(DomainError::internal("Mock dispatch target error"));
        }
        Ok(())
    }
}

#[async_trait]
impl DispatchTargetRepository for MockDispatchTargetRepository {
    async fn upsert_service_health(&self, record: &ServiceHealthRecord) -> Result<(), DomainError> {
        self.check_failure()?;
        let mut tables = self.tables.write().await;
        tables
            .health
            .insert(record.service_name.clone(), record.clone());
        Ok(())
    }

    async fn insert_service_issue(&self, record: &ServiceIssueRecord) -> Result<(), DomainError> {
        self.check_failure()?;
        self.tables.write().await.issues.push(record.clone());
        Ok(())
    }

    async fn insert_service_event(&self, record: &ServiceEventRecord) -> Result<(), DomainError> {
        self.check_failure()?;
        self.tables.write().await.events.push(record.clone());
        Ok(())
    }

    async fn admin_user_ids(&self) -> Result<Vec<String>, DomainError> {
        self.check_failure()?;
        Ok(self.tables.read().await.admins.clone())
    }

    async fn insert_notifications(&self, records: &[NotificationRecord]) -> Result<usize, DomainError> {
        self.check_failure()?;
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(DomainError::internal("Mock notification insert error"));
        }
        self.tables
            .write()
            .await
            .notifications
            .extend(records.iter().cloned());
        Ok(records.len())
    }

    async fn latest_health_by_service(&self) -> Result<Vec<ServiceHealthRecord>, DomainError> {
        Ok(self.tables.read().await.health.values().cloned().collect())
    }
}
