use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};

use crate::app::AppState;
use crate::dto::auth_dto::{VerifyTokenFailure, VerifyTokenRequest, VerifyTokenResponse};
use crate::handlers::error::handle_domain_error;
use crate::middleware::request_id::request_context;

/// Handler for POST /mcp-auth/verify
///
/// Verifies an access token on behalf of another service. Runs the same
/// check as bearer-protected routes, including the revocation lookup.
///
/// # Request Body
///
/// ```json
/// {
///     "token": "eyJ...",
///     "required_scope": "events:write"
/// }
/// ```
///
/// # Response
///
/// ## Success (200 OK)
/// ```json
/// {
///     "valid": true,
///     "service_id": "minu-find",
///     "client_id": "string",
///     "scope": ["events:write"],
///     "expires_at": "2026-01-01T00:15:00Z",
///     "remaining_seconds": 840
/// }
/// ```
///
/// ## Failure (401, or 403 for a missing scope)
/// ```json
/// { "valid": false, "error": "token_revoked", "message": "Token has been revoked" }
/// ```
pub async fn verify_token(
    state: web::Data<AppState>,
    req: HttpRequest,
    request: web::Json<VerifyTokenRequest>,
) -> HttpResponse {
    let ctx = request_context(&req);
    let required_scopes = request.required_scopes();

    match state
        .tokens
        .verify(&request.token, required_scopes.as_slice(), &ctx)
        .await
    {
        Ok(verification) => HttpResponse::Ok().json(VerifyTokenResponse {
            valid: true,
            verification,
        }),
        Err(error) if error.status_code() < 500 => {
            let status = StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::UNAUTHORIZED);
            HttpResponse::build(status).json(VerifyTokenFailure {
                valid: false,
                error: error.code().to_string(),
                message: error.to_string(),
            })
        }
        Err(error) => handle_domain_error(error, &req),
    }
}
