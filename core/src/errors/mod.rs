//! Domain-specific error types and error handling.

mod types;

pub use types::{AuthError, DispatchError, TokenError};

use mcp_shared::error_codes;
use thiserror::Error;

/// Core domain errors (general purpose)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl DomainError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation { .. } => error_codes::INVALID_REQUEST,
            DomainError::NotFound { .. } => error_codes::NOT_FOUND,
            DomainError::Internal { .. } => error_codes::INTERNAL_ERROR,
            DomainError::Auth(e) => e.code(),
            DomainError::Token(e) => e.code(),
            DomainError::Dispatch(e) => e.code(),
        }
    }

    /// HTTP status class of the error
    pub fn status_code(&self) -> u16 {
        match self {
            DomainError::Validation { .. } => 400,
            DomainError::NotFound { .. } => 404,
            DomainError::Internal { .. } => 500,
            DomainError::Auth(e) => match e {
                AuthError::InvalidTimestamp
                | AuthError::InvalidSignature
                | AuthError::MissingAuthorization => 401,
                AuthError::ConfigurationError { .. } => 500,
                AuthError::MissingHeader { .. }
                | AuthError::InvalidService { .. }
                | AuthError::UnsupportedGrantType { .. }
                | AuthError::InvalidScope
                | AuthError::InvalidRequest { .. } => 400,
            },
            DomainError::Token(e) => match e {
                TokenError::InsufficientScope { .. } => 403,
                TokenError::TokenGenerationFailed => 500,
                TokenError::InvalidToken
                | TokenError::TokenExpired
                | TokenError::TokenRevoked
                | TokenError::RefreshTokenReuse => 401,
            },
            DomainError::Dispatch(e) => match e {
                DispatchError::DispatchFailed { .. } => 500,
                DispatchError::InvalidPayload { .. } | DispatchError::NoMatchingRule { .. } => 400,
            },
        }
    }

    /// Shorthand for repository failures
    pub fn internal(message: impl Into<String>) -> Self {
        DomainError::Internal {
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(DomainError, u16, &str)> = vec![
            (TokenError::InvalidToken.into(), 401, "invalid_token"),
            (TokenError::TokenExpired.into(), 401, "token_expired"),
            (TokenError::TokenRevoked.into(), 401, "token_revoked"),
            (TokenError::RefreshTokenReuse.into(), 401, "refresh_token_reuse"),
            (TokenError::InsufficientScope { missing: "x".into() }.into(), 403, "insufficient_scope"),
            (AuthError::InvalidSignature.into(), 401, "invalid_signature"),
            (AuthError::InvalidTimestamp.into(), 401, "invalid_timestamp"),
            (AuthError::MissingAuthorization.into(), 401, "missing_authorization"),
            (AuthError::MissingHeader { header: "X-Service-Id".into() }.into(), 400, "missing_header"),
            (AuthError::InvalidService { service_id: "x".into() }.into(), 400, "invalid_service"),
            (AuthError::UnsupportedGrantType { grant_type: "password".into() }.into(), 400, "unsupported_grant_type"),
            (AuthError::InvalidScope.into(), 400, "invalid_scope"),
            (AuthError::ConfigurationError { service_id: "minu-find".into() }.into(), 500, "configuration_error"),
            (DispatchError::InvalidPayload { reason: "x".into() }.into(), 400, "invalid_payload"),
            (DispatchError::NoMatchingRule { event_type: "x".into() }.into(), 400, "no_routing_rule"),
            (DispatchError::DispatchFailed { target: "t".into(), reason: "r".into() }.into(), 500, "dispatch_failed"),
            (DomainError::internal("db down"), 500, "internal_error"),
            (DomainError::NotFound { resource: "route".into() }, 404, "not_found"),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.status_code(), status, "status for {:?}", error);
            assert_eq!(error.code(), code, "code for {:?}", error);
        }
    }

    #[test]
    fn test_transparent_messages() {
        let error: DomainError = TokenError::TokenRevoked.into();
        assert_eq!(error.to_string(), "Token has been revoked");
    }
}
