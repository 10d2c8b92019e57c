//! Domain entities representing core business objects.

pub mod audit;
pub mod event;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use audit::{AuditEventType, AuditLog, RequestContext};
pub use event::{
    DispatchTarget, EventEnvelope, EventQueueItem, NotificationDraft, NotificationRecord,
    Priority, PriorityCounts, QueueCounts, QueueInsert, QueueStatus, ServiceEventRecord,
    ServiceHealthRecord, ServiceIssueRecord, TransformedEvent,
};
pub use service::{scopes, ServiceId};
pub use token::{
    Claims, IssuedTokens, RetryPolicy, RevocationResult, RevokedToken, ScopeParam,
    ServiceToken, TokenRequest, TokenType, TokenVerification, ACCESS_TOKEN_EXPIRY_SECONDS,
    JWT_AUDIENCE, JWT_ISSUER, REFRESH_TOKEN_EXPIRY_SECONDS, REFRESH_TOKEN_PREFIX,
};
