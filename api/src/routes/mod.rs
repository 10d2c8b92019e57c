//! Route table
//!
//! Every resource carries a `method_not_allowed` default service so a known
//! path with the wrong method answers 405 instead of falling through to 404.

pub mod auth;
pub mod health;
pub mod router;

use actix_web::{web, HttpRequest};

use mcp_core::domain::entities::service::scopes;

use crate::handlers::error::method_not_allowed;
use crate::middleware::auth::BearerAuth;

/// Register every route on the application
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/health")
            .route(web::get().to(health::health_check))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::scope("/mcp-auth")
            .service(
                web::resource("/token")
                    .route(web::post().to(auth::token::issue_token))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/verify")
                    .route(web::post().to(auth::verify::verify_token))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/refresh")
                    .route(web::post().to(auth::refresh::refresh_token))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/revoke")
                    .route(
                        web::post()
                            .to(auth::revoke::revoke_token)
                            .wrap(BearerAuth::new()),
                    )
                    .default_service(web::to(method_not_allowed)),
            ),
    )
    .service(
        web::scope("/mcp-router")
            .service(
                web::resource("/dispatch")
                    .route(
                        web::post()
                            .to(router::dispatch::dispatch_event)
                            .wrap(BearerAuth::with_scopes(&[scopes::EVENTS_WRITE])),
                    )
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/status")
                    .route(
                        web::get()
                            .to(router::status::router_status)
                            .wrap(BearerAuth::with_scopes(&[scopes::EVENTS_READ])),
                    )
                    .default_service(web::to(method_not_allowed)),
            ),
    );
}

/// Header value as UTF-8, if present
pub(crate) fn header_str<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|value| value.to_str().ok())
}
