//! Database module - MySQL implementations using SQLx
//!
//! This module provides:
//! - Connection pool management and migrations
//! - Repository implementations for tokens, audit logs, the event queue
//!   and dispatch targets

pub mod connection;
pub mod mysql;


// Re-export commonly used types
pub use connection::{DatabasePool, PoolStatistics};
pub use mysql::{
    MySqlAuditLogRepository, MySqlDispatchTargetRepository, MySqlEventQueueRepository,
    MySqlTokenRepository,
};
