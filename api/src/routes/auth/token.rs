use actix_web::{web, HttpRequest, HttpResponse};

use mcp_core::services::token::{
    ServiceCredentials, SERVICE_ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};

use super::token_response;
use crate::app::AppState;
use crate::handlers::error::handle_domain_error;
use crate::middleware::request_id::request_context;
use crate::routes::header_str;

/// Handler for POST /mcp-auth/token
///
/// Issues an access/refresh token pair to a service that proves its
/// identity with an HMAC-SHA256 signature over the raw request body.
///
/// # Headers
/// - `X-Service-Id`: registered service id
/// - `X-Signature`: hex HMAC of the body with the service's webhook secret
/// - `X-Timestamp` (optional): must be within the tolerance window
///
/// # Request Body
///
/// ```json
/// {
///     "grant_type": "service_credentials",
///     "client_id": "string",
///     "scope": "events:write events:read"
/// }
/// ```
///
/// # Response
///
/// ## Success (200 OK)
/// ```json
/// {
///     "access_token": "eyJ...",
///     "refresh_token": "mcp_rt_...",
///     "expires_in": 900,
///     "refresh_expires_in": 604800,
///     "token_type": "Bearer",
///     "scope": ["events:write", "events:read"],
///     "issued_at": "2026-01-01T00:00:00Z",
///     "retry_policy": {"max_retries": 3, "backoff": "exponential", "base_delay_ms": 1000}
/// }
/// ```
///
/// ## Errors
/// - 400 Bad Request: missing header, unknown service, bad grant type or scope
/// - 401 Unauthorized: invalid signature or timestamp
/// - 500 Internal Server Error: secret not provisioned or storage failure
pub async fn issue_token(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    // The signature covers the body exactly as sent, so it is not parsed here
    let credentials = ServiceCredentials {
        service_id: header_str(&req, SERVICE_ID_HEADER),
        signature: header_str(&req, SIGNATURE_HEADER),
        timestamp: header_str(&req, TIMESTAMP_HEADER),
        body: &body,
    };
    let ctx = request_context(&req);

    match state.tokens.issue_tokens(&credentials, &ctx).await {
        Ok(tokens) => {
            log::info!(
                "Issued tokens to {} (request {})",
                credentials.service_id.unwrap_or_default(),
                ctx.request_id
            );
            token_response(&tokens)
        }
        Err(error) => handle_domain_error(error, &req),
    }
}
