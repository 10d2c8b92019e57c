//! Repository traits and their in-memory implementations.

pub mod audit;
pub mod dispatch;
pub mod event_queue;
pub mod token;

pub use audit::{AuditLogRepository, MockAuditLogRepository};
pub use dispatch::{DispatchTargetRepository, MockDispatchTargetRepository};
pub use event_queue::{EventQueueRepository, MockEventQueueRepository};
pub use token::{MockTokenRepository, TokenRepository};
