use actix_web::{web, HttpRequest, HttpResponse};

use mcp_core::domain::entities::event::EventEnvelope;
use mcp_core::errors::{DispatchError, DomainError};

use crate::app::AppState;
use crate::handlers::error::handle_domain_error;
use crate::middleware::auth::AuthContext;
use crate::middleware::request_id::request_context;
use crate::routes::header_str;

/// Takes precedence over `idempotency_key` in the body
pub const IDEMPOTENCY_KEY_HEADER: &str = "X-Idempotency-Key";

/// Handler for POST /mcp-router/dispatch
///
/// Routes an event to its target table. Requires the `events:write` scope.
///
/// # Request Body
///
/// ```json
/// {
///     "event_type": "service.health.report",
///     "source_service": "minu-find",
///     "payload": {"status": "healthy"},
///     "priority": "normal",
///     "idempotency_key": "optional"
/// }
/// ```
///
/// # Response
///
/// ## Accepted (202)
/// ```json
/// {
///     "dispatched": true,
///     "dispatch_id": "uuid",
///     "status": "processed",
///     "rule": "service_health",
///     "target": "service_health",
///     "estimated_delivery": "2026-01-01T00:00:00.500Z",
///     "retry_policy": {"max_retries": 3, "backoff": "exponential", "base_delay_ms": 1000},
///     "duplicate": false
/// }
/// ```
///
/// ## Errors
/// - 400 Bad Request: malformed envelope or unknown priority
/// - 500 Internal Server Error: a target write failed
pub async fn dispatch_event(
    state: web::Data<AppState>,
    req: HttpRequest,
    caller: AuthContext,
    body: web::Bytes,
) -> HttpResponse {
    let envelope: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            let error: DomainError = DispatchError::InvalidPayload {
                reason: e.to_string(),
            }
            .into();
            return handle_domain_error(error, &req);
        }
    };

    let ctx = request_context(&req);
    let header_key = header_str(&req, IDEMPOTENCY_KEY_HEADER);

    match state
        .router
        .dispatch(envelope, header_key, &caller, &ctx)
        .await
    {
        Ok(receipt) => {
            if receipt.duplicate {
                log::info!(
                    "Duplicate dispatch {} from {}",
                    receipt.dispatch_id,
                    caller.service_id
                );
            }
            HttpResponse::Accepted().json(receipt)
        }
        Err(error) => handle_domain_error(error, &req),
    }
}
