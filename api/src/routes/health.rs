use actix_web::{web, HttpResponse};

use crate::app::AppState;

/// Handler for GET /health
///
/// Unauthenticated liveness check for load balancers.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let now = state.clock.now();

    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "mcp-hub",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": now.to_rfc3339(),
        "uptime_seconds": state.liveness.uptime_seconds(now),
    }))
}
