//! Domain error to HTTP response mapping.
//!
//! Every failure leaves the API as the shared `{"error": {...}}` envelope,
//! whether it comes from a handler, a middleware or an extractor.

use actix_web::{
    error::JsonPayloadError,
    http::StatusCode,
    HttpRequest, HttpResponse, ResponseError,
};
use std::fmt;

use mcp_core::errors::DomainError;
use mcp_shared::errors::{error_codes, ErrorEnvelope};

use crate::middleware::request_id::request_id_of;

/// Error rendered as the shared error envelope
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    envelope: ErrorEnvelope,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &str,
        message: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            status,
            envelope: ErrorEnvelope::new(code, message, request_id),
        }
    }

    /// Map a domain error to its status and code
    pub fn from_domain(error: &DomainError, request_id: impl Into<String>) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Internal details stay in the logs
        let message = match error {
            DomainError::Internal { .. } => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        Self::new(status, error.code(), message, request_id)
    }

    pub fn invalid_request(message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            error_codes::INVALID_REQUEST,
            message,
            request_id,
        )
    }

    /// Attach structured details (field errors, etc.)
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.envelope = self.envelope.with_details(details);
        self
    }

    pub fn code(&self) -> &str {
        self.envelope.code()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.envelope.error.code, self.envelope.error.message)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(&self.envelope)
    }
}

/// Log a domain error and render it
pub fn handle_domain_error(error: DomainError, req: &HttpRequest) -> HttpResponse {
    let api_error = ApiError::from_domain(&error, request_id_of(req));

    if api_error.status.is_server_error() {
        log::error!("{} {} failed: {:?}", req.method(), req.path(), error);
    } else {
        log::info!("{} {} rejected: {}", req.method(), req.path(), api_error);
    }

    api_error.error_response()
}

/// Malformed JSON bodies become `invalid_request`
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    ApiError::invalid_request(format!("Invalid JSON body: {}", err), request_id_of(req)).into()
}

/// Default service for unknown paths
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    ApiError::new(
        StatusCode::NOT_FOUND,
        error_codes::NOT_FOUND,
        "The requested resource was not found",
        request_id_of(&req),
    )
    .error_response()
}

/// Default service of every resource, reached when no route matches the method
pub async fn method_not_allowed(req: HttpRequest) -> HttpResponse {
    ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        error_codes::METHOD_NOT_ALLOWED,
        format!("Method {} is not allowed on {}", req.method(), req.path()),
        request_id_of(&req),
    )
    .error_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use mcp_core::errors::{DispatchError, TokenError};

    async fn body_json(response: HttpResponse) -> serde_json::Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn test_domain_error_status_and_envelope() {
        let error: DomainError = TokenError::InsufficientScope {
            missing: "events:read".to_string(),
        }
        .into();
        let api_error = ApiError::from_domain(&error, "req-42");

        assert_eq!(api_error.status_code(), StatusCode::FORBIDDEN);
        let json = body_json(api_error.error_response()).await;
        assert_eq!(json["error"]["code"], "insufficient_scope");
        assert_eq!(json["error"]["request_id"], "req-42");
    }

    #[actix_web::test]
    async fn test_internal_message_is_hidden() {
        let error = DomainError::internal("connection refused on 10.0.0.3:3306");
        let json = body_json(ApiError::from_domain(&error, "req-1").error_response()).await;

        assert_eq!(json["error"]["code"], "internal_error");
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[test]
    fn test_dispatch_failure_is_server_error() {
        let error: DomainError = DispatchError::DispatchFailed {
            target: "service_health".to_string(),
            reason: "timeout".to_string(),
        }
        .into();
        let api_error = ApiError::from_domain(&error, "req-2");

        assert_eq!(api_error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.code(), "dispatch_failed");
    }
}
