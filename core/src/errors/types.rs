//! Error types for credential issuance, token lifecycle and event dispatch.
//!
//! Every variant exposes a stable `code()` that is sent to callers verbatim.

use mcp_shared::error_codes;
use thiserror::Error;

/// Credential and token request errors raised before a token is minted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing required header: {header}")]
    MissingHeader { header: String },

    #[error("Unknown service: {service_id}")]
    InvalidService { service_id: String },

    #[error("Request timestamp is missing, malformed or outside the accepted window")]
    InvalidTimestamp,

    #[error("Request signature does not match")]
    InvalidSignature,

    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType { grant_type: String },

    #[error("None of the requested scopes are recognized")]
    InvalidScope,

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Missing bearer token")]
    MissingAuthorization,

    #[error("Service credentials are not configured for {service_id}")]
    ConfigurationError { service_id: String },
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader { .. } => error_codes::MISSING_HEADER,
            AuthError::InvalidService { .. } => error_codes::INVALID_SERVICE,
            AuthError::InvalidTimestamp => error_codes::INVALID_TIMESTAMP,
            AuthError::InvalidSignature => error_codes::INVALID_SIGNATURE,
            AuthError::UnsupportedGrantType { .. } => error_codes::UNSUPPORTED_GRANT_TYPE,
            AuthError::InvalidScope => error_codes::INVALID_SCOPE,
            AuthError::InvalidRequest { .. } => error_codes::INVALID_REQUEST,
            AuthError::MissingAuthorization => error_codes::MISSING_AUTHORIZATION,
            AuthError::ConfigurationError { .. } => error_codes::CONFIGURATION_ERROR,
        }
    }
}

/// Token lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is invalid")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Token lacks required scope: {missing}")]
    InsufficientScope { missing: String },

    #[error("Refresh token was already used; all tokens for the service have been revoked")]
    RefreshTokenReuse,

    #[error("Token generation failed")]
    TokenGenerationFailed,
}

impl TokenError {
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::InvalidToken => error_codes::INVALID_TOKEN,
            TokenError::TokenExpired => error_codes::TOKEN_EXPIRED,
            TokenError::TokenRevoked => error_codes::TOKEN_REVOKED,
            TokenError::InsufficientScope { .. } => error_codes::INSUFFICIENT_SCOPE,
            TokenError::RefreshTokenReuse => error_codes::REFRESH_TOKEN_REUSE,
            TokenError::TokenGenerationFailed => error_codes::INTERNAL_ERROR,
        }
    }
}

/// Event router errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Invalid event payload: {reason}")]
    InvalidPayload { reason: String },

    #[error("No routing rule matches event type {event_type}")]
    NoMatchingRule { event_type: String },

    #[error("Dispatch to {target} failed: {reason}")]
    DispatchFailed { target: String, reason: String },
}

impl DispatchError {
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::InvalidPayload { .. } => error_codes::INVALID_PAYLOAD,
            DispatchError::NoMatchingRule { .. } => error_codes::NO_ROUTING_RULE,
            DispatchError::DispatchFailed { .. } => error_codes::DISPATCH_FAILED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_codes() {
        let error = AuthError::MissingHeader {
            header: "X-Signature".to_string(),
        };
        assert_eq!(error.code(), "missing_header");
        assert!(error.to_string().contains("X-Signature"));
        assert_eq!(AuthError::InvalidSignature.code(), "invalid_signature");
        assert_eq!(
            AuthError::ConfigurationError { service_id: "minu-find".into() }.code(),
            "configuration_error"
        );
    }

    #[test]
    fn test_token_error_codes() {
        assert_eq!(TokenError::RefreshTokenReuse.code(), "refresh_token_reuse");
        assert_eq!(
            TokenError::InsufficientScope { missing: "events:read".into() }.code(),
            "insufficient_scope"
        );
        assert_eq!(TokenError::TokenGenerationFailed.code(), "internal_error");
    }

    #[test]
    fn test_dispatch_error_codes() {
        let error = DispatchError::DispatchFailed {
            target: "service_issues".into(),
            reason: "connection reset".into(),
        };
        assert_eq!(error.code(), "dispatch_failed");
        assert!(error.to_string().contains("service_issues"));
    }
}
