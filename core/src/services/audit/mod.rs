//! Audit service module for recording token lifecycle and dispatch outcomes.

mod service;

pub use service::{AuditService, AuditServiceConfig};
