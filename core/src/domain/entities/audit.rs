//! Audit log entity for token lifecycle and dispatch outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use uuid::Uuid;

/// Event types recorded in `mcp_audit_logs`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    // Issuance
    TokenIssued,
    TokenIssueFailure,

    // Verification
    TokenVerified,
    TokenVerificationFailure,

    // Rotation
    TokenRefreshed,
    TokenRefreshFailure,
    RefreshTokenReuse,

    // Revocation
    TokenRevoked,

    // Routing
    EventDispatched,
    EventDispatchFailure,
    StatusRead,

    // Bearer authentication on protected routes
    AuthenticationFailure,
}

impl AuditEventType {
    /// Convert to string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenIssued => "TOKEN_ISSUED",
            Self::TokenIssueFailure => "TOKEN_ISSUE_FAILURE",
            Self::TokenVerified => "TOKEN_VERIFIED",
            Self::TokenVerificationFailure => "TOKEN_VERIFICATION_FAILURE",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::TokenRefreshFailure => "TOKEN_REFRESH_FAILURE",
            Self::RefreshTokenReuse => "REFRESH_TOKEN_REUSE",
            Self::TokenRevoked => "TOKEN_REVOKED",
            Self::EventDispatched => "EVENT_DISPATCHED",
            Self::EventDispatchFailure => "EVENT_DISPATCH_FAILURE",
            Self::StatusRead => "STATUS_READ",
            Self::AuthenticationFailure => "AUTHENTICATION_FAILURE",
        }
    }
}

impl FromStr for AuditEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TOKEN_ISSUED" => Ok(Self::TokenIssued),
            "TOKEN_ISSUE_FAILURE" => Ok(Self::TokenIssueFailure),
            "TOKEN_VERIFIED" => Ok(Self::TokenVerified),
            "TOKEN_VERIFICATION_FAILURE" => Ok(Self::TokenVerificationFailure),
            "TOKEN_REFRESHED" => Ok(Self::TokenRefreshed),
            "TOKEN_REFRESH_FAILURE" => Ok(Self::TokenRefreshFailure),
            "REFRESH_TOKEN_REUSE" => Ok(Self::RefreshTokenReuse),
            "TOKEN_REVOKED" => Ok(Self::TokenRevoked),
            "EVENT_DISPATCHED" => Ok(Self::EventDispatched),
            "EVENT_DISPATCH_FAILURE" => Ok(Self::EventDispatchFailure),
            "STATUS_READ" => Ok(Self::StatusRead),
            "AUTHENTICATION_FAILURE" => Ok(Self::AuthenticationFailure),
            _ => Err(format!("Unknown audit event type: {}", s)),
        }
    }
}

/// Per-request metadata threaded from the HTTP layer into services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub endpoint: String,
    pub method: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Context with a generated request id
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            endpoint: endpoint.into(),
            method: method.into(),
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// Write-once audit record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLog {
    /// Unique identifier for the log entry
    pub id: Uuid,

    pub event_type: AuditEventType,

    /// Endpoint path, e.g. `/mcp-auth/token`
    pub endpoint: String,

    /// HTTP method
    pub method: String,

    pub service_id: Option<String>,
    pub client_id: Option<String>,

    /// HTTP status returned to the caller
    pub status_code: u16,

    pub success: bool,

    /// Stable error code for failures
    pub error_code: Option<String>,

    pub request_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,

    /// Additional event data in JSON format
    pub details: Option<JsonValue>,

    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    /// Create a successful entry for the request described by `ctx`
    pub fn new(event_type: AuditEventType, ctx: &RequestContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            endpoint: ctx.endpoint.clone(),
            method: ctx.method.clone(),
            service_id: None,
            client_id: None,
            status_code: 200,
            success: true,
            error_code: None,
            request_id: ctx.request_id.clone(),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
            details: None,
            created_at: Utc::now(),
        }
    }

    /// Add caller identity
    pub fn with_service(mut self, service_id: Option<String>, client_id: Option<String>) -> Self {
        self.service_id = service_id;
        self.client_id = client_id;
        self
    }

    /// Set the response status; 4xx and 5xx mark the entry unsuccessful
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self.success = status_code < 400;
        self
    }

    /// Record a failure code
    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self.success = false;
        self
    }

    /// Add event data as JSON
    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_string_round_trip() {
        let all = [
            AuditEventType::TokenIssued,
            AuditEventType::TokenIssueFailure,
            AuditEventType::TokenVerified,
            AuditEventType::TokenVerificationFailure,
            AuditEventType::TokenRefreshed,
            AuditEventType::TokenRefreshFailure,
            AuditEventType::RefreshTokenReuse,
            AuditEventType::TokenRevoked,
            AuditEventType::EventDispatched,
            AuditEventType::EventDispatchFailure,
            AuditEventType::StatusRead,
            AuditEventType::AuthenticationFailure,
        ];
        for event_type in all {
            assert_eq!(event_type.as_str().parse::<AuditEventType>().unwrap(), event_type);
        }
        assert!("LOGIN_SUCCESS".parse::<AuditEventType>().is_err());
    }

    #[test]
    fn test_builder_marks_failures() {
        let ctx = RequestContext::new("POST", "/mcp-auth/refresh")
            .with_request_id("req-42")
            .with_client(Some("10.0.0.1".into()), Some("minu-find/1.0".into()));

        let log = AuditLog::new(AuditEventType::RefreshTokenReuse, &ctx)
            .with_service(Some("minu-find".into()), Some("crawler".into()))
            .with_status(401)
            .with_error_code("refresh_token_reuse");

        assert!(!log.success);
        assert_eq!(log.status_code, 401);
        assert_eq!(log.request_id, "req-42");
        assert_eq!(log.endpoint, "/mcp-auth/refresh");
        assert_eq!(log.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(log.error_code.as_deref(), Some("refresh_token_reuse"));
    }

    #[test]
    fn test_success_by_default() {
        let ctx = RequestContext::new("GET", "/mcp-router/status");
        let log = AuditLog::new(AuditEventType::StatusRead, &ctx);
        assert!(log.success);
        assert_eq!(log.status_code, 200);
        assert!(!log.request_id.is_empty());
    }
}
