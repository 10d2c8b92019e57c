use actix_web::{web, HttpRequest, HttpResponse};

use super::token_response;
use crate::app::AppState;
use crate::dto::auth_dto::RefreshTokenRequest;
use crate::handlers::error::handle_domain_error;
use crate::middleware::request_id::request_context;

/// Handler for POST /mcp-auth/refresh
///
/// Rotates a refresh token into a new pair. Each refresh token is single
/// use; presenting a consumed one revokes every token of its service.
///
/// # Request Body
///
/// ```json
/// {
///     "grant_type": "refresh_token",
///     "refresh_token": "mcp_rt_..."
/// }
/// ```
///
/// ## Errors
/// - 400 Bad Request: grant type other than `refresh_token`
/// - 401 Unauthorized: invalid, expired, revoked or reused refresh token
pub async fn refresh_token(
    state: web::Data<AppState>,
    req: HttpRequest,
    request: web::Json<RefreshTokenRequest>,
) -> HttpResponse {
    let ctx = request_context(&req);

    match state
        .tokens
        .refresh_tokens(
            request.grant_type.as_deref(),
            request.refresh_token.as_deref(),
            &ctx,
        )
        .await
    {
        Ok(tokens) => token_response(&tokens),
        Err(error) => handle_domain_error(error, &req),
    }
}
