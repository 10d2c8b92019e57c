use actix_web::{web, HttpRequest, HttpResponse};

use crate::app::AppState;
use crate::handlers::error::handle_domain_error;
use crate::middleware::auth::AuthContext;
use crate::middleware::request_id::request_context;

/// Handler for GET /mcp-router/status
///
/// Queue counts, success rate, per-service connectivity and uptime.
/// Requires the `events:read` scope.
pub async fn router_status(
    state: web::Data<AppState>,
    req: HttpRequest,
    caller: AuthContext,
) -> HttpResponse {
    let ctx = request_context(&req);

    match state.status.report(&caller, &ctx).await {
        Ok(status) => HttpResponse::Ok().json(status),
        Err(error) => handle_domain_error(error, &req),
    }
}
