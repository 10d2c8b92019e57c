use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use validator::Validate;

use crate::app::AppState;
use crate::dto::auth_dto::RevokeTokenRequest;
use crate::handlers::error::{handle_domain_error, ApiError};
use crate::middleware::auth::AuthContext;
use crate::middleware::request_id::{request_context, request_id_of};

/// Handler for POST /mcp-auth/revoke
///
/// Revokes an access or refresh token. Requires a valid bearer token.
/// Unknown tokens get the same success response as known ones.
///
/// # Request Body
///
/// ```json
/// {
///     "token": "string",
///     "token_type_hint": "refresh_token",
///     "reason": "string"
/// }
/// ```
///
/// # Response
///
/// ## Success (200 OK)
/// ```json
/// { "revoked": true, "revoked_at": "2026-01-01T00:00:00Z" }
/// ```
pub async fn revoke_token(
    state: web::Data<AppState>,
    req: HttpRequest,
    caller: AuthContext,
    request: web::Json<RevokeTokenRequest>,
) -> HttpResponse {
    if let Err(errors) = request.validate() {
        let details = serde_json::to_value(&errors).unwrap_or_default();
        return ApiError::invalid_request("Invalid revocation request", request_id_of(&req))
            .with_details(details)
            .error_response();
    }

    let ctx = request_context(&req);
    match state
        .tokens
        .revoke_token(
            &request.token,
            request.token_type_hint.as_deref(),
            request.reason.as_deref(),
            &caller,
            &ctx,
        )
        .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(error) => handle_domain_error(error, &req),
    }
}
