//! Shared error envelope returned by every endpoint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of an error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    /// Stable machine-readable code (see [`error_codes`])
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Additional error details (field errors, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Request id echoed from `X-Request-Id` or generated
    pub request_id: String,

    /// Timestamp when the error occurred
    pub timestamp: DateTime<Utc>,
}

/// `{"error": {...}}` wrapper
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    /// Create a new error envelope
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
                request_id: request_id.into(),
                timestamp: Utc::now(),
            },
        }
    }

    /// Attach details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Error code
    pub fn code(&self) -> &str {
        &self.error.code
    }
}

/// Error codes exposed on the wire
pub mod error_codes {
    // authentication (401)
    pub const INVALID_TOKEN: &str = "invalid_token";
    pub const TOKEN_EXPIRED: &str = "token_expired";
    pub const TOKEN_REVOKED: &str = "token_revoked";
    pub const REFRESH_TOKEN_REUSE: &str = "refresh_token_reuse";
    pub const INVALID_SIGNATURE: &str = "invalid_signature";
    pub const INVALID_TIMESTAMP: &str = "invalid_timestamp";
    pub const MISSING_AUTHORIZATION: &str = "missing_authorization";

    // authorization (403)
    pub const INSUFFICIENT_SCOPE: &str = "insufficient_scope";

    // client request (400)
    pub const MISSING_HEADER: &str = "missing_header";
    pub const INVALID_SERVICE: &str = "invalid_service";
    pub const UNSUPPORTED_GRANT_TYPE: &str = "unsupported_grant_type";
    pub const INVALID_SCOPE: &str = "invalid_scope";
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const INVALID_PAYLOAD: &str = "invalid_payload";
    pub const NO_ROUTING_RULE: &str = "no_routing_rule";

    pub const NOT_FOUND: &str = "not_found";
    pub const METHOD_NOT_ALLOWED: &str = "method_not_allowed";

    // server (500)
    pub const CONFIGURATION_ERROR: &str = "configuration_error";
    pub const DISPATCH_FAILED: &str = "dispatch_failed";
    pub const INTERNAL_ERROR: &str = "internal_error";
}
