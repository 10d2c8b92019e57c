//! MySQL-specific database implementations
//!
//! UUIDs are stored as `CHAR(36)` and JSON documents as `TEXT`.

pub mod audit_repository_impl;
pub mod dispatch_repository_impl;
pub mod event_queue_repository_impl;
pub mod token_repository_impl;

use std::str::FromStr;

use mcp_core::errors::DomainError;
use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Row};
use uuid::Uuid;

// Re-export the MySQL implementations
pub use audit_repository_impl::MySqlAuditLogRepository;
pub use dispatch_repository_impl::MySqlDispatchTargetRepository;
pub use event_queue_repository_impl::MySqlEventQueueRepository;
pub use token_repository_impl::MySqlTokenRepository;

/// Read a column, mapping decode failures to `DomainError::Internal`
pub(crate) fn column<'r, T>(row: &'r MySqlRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get(name).map_err(|e| DomainError::Internal {
        message: format!("Failed to get {}: {}", name, e),
    })
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(value).map_err(|e| DomainError::Internal {
        message: format!("Invalid UUID {}: {}", value, e),
    })
}

pub(crate) fn parse_json(value: &str) -> Result<JsonValue, DomainError> {
    serde_json::from_str(value).map_err(|e| DomainError::Internal {
        message: format!("Invalid JSON column: {}", e),
    })
}

/// Parse a stored enum value through its `FromStr` impl
pub(crate) fn parse_enum<T>(value: &str) -> Result<T, DomainError>
where
    T: FromStr<Err = String>,
{
    T::from_str(value).map_err(|message| DomainError::Internal { message })
}

pub(crate) fn db_error(context: &str, error: sqlx::Error) -> DomainError {
    tracing::error!("{}: {}", context, error);
    DomainError::Internal {
        message: format!("{}: {}", context, error),
    }
}

/// Whether the statement hit a UNIQUE constraint
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}
