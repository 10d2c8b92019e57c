//! CORS middleware configuration for cross-origin requests.
//!
//! Calling services are server-side, but the endpoints are also reachable
//! from browser tooling. Any origin is accepted unless `ALLOWED_ORIGINS`
//! names an explicit list; production without a list stays permissive and
//! logs a warning.

use actix_cors::Cors;
use actix_web::http::{header, Method};

use mcp_shared::config::{CorsConfig, Environment};

/// Headers the hub reads from callers
fn allowed_headers() -> Vec<header::HeaderName> {
    vec![
        header::AUTHORIZATION,
        header::ACCEPT,
        header::CONTENT_TYPE,
        header::HeaderName::from_static("x-service-id"),
        header::HeaderName::from_static("x-signature"),
        header::HeaderName::from_static("x-timestamp"),
        header::HeaderName::from_static("x-idempotency-key"),
        header::HeaderName::from_static("x-request-id"),
    ]
}

/// Creates a CORS middleware instance for the given configuration
pub fn create_cors(config: &CorsConfig, environment: Environment) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allowed_headers(allowed_headers())
        .expose_headers(vec![header::HeaderName::from_static("x-request-id")])
        .max_age(config.max_age);

    if config.allowed_origins.is_empty() {
        if environment.is_production() {
            log::warn!("ALLOWED_ORIGINS is empty; accepting any origin in production");
        }
        cors = cors.allow_any_origin().send_wildcard();
    } else {
        for origin in &config.allowed_origins {
            log::info!("Adding allowed origin: {}", origin);
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}
