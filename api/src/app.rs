//! Application state and factory
//!
//! This module wires repositories into the core services and provides the
//! factory for creating the Actix-web application.

use std::sync::Arc;

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::Logger,
    web, App,
};

use mcp_core::errors::DomainError;
use mcp_core::repositories::{
    AuditLogRepository, DispatchTargetRepository, EventQueueRepository,
    MockAuditLogRepository, MockDispatchTargetRepository, MockEventQueueRepository,
    MockTokenRepository, TokenRepository,
};
use mcp_core::services::audit::{AuditService, AuditServiceConfig};
use mcp_core::services::clock::{Clock, LivenessProvider};
use mcp_core::services::router::{EventRouter, RoutingTable};
use mcp_core::services::status::StatusReporter;
use mcp_core::services::token::{CredentialVerifier, TokenService, TokenServiceConfig};
use mcp_infra::database::{
    DatabasePool, MySqlAuditLogRepository, MySqlDispatchTargetRepository,
    MySqlEventQueueRepository, MySqlTokenRepository,
};
use mcp_shared::config::{AuthConfig, CorsConfig, Environment};

use crate::handlers::error::{json_error_handler, not_found};
use crate::middleware::{cors::create_cors, request_id::RequestIdMiddleware};
use crate::routes;

/// Largest accepted JSON body
const JSON_LIMIT_BYTES: usize = 256 * 1024;

/// Repository set backing the services
#[derive(Clone)]
pub struct Repositories {
    pub tokens: Arc<dyn TokenRepository>,
    pub audit: Arc<dyn AuditLogRepository>,
    pub queue: Arc<dyn EventQueueRepository>,
    pub targets: Arc<dyn DispatchTargetRepository>,
}

impl Repositories {
    /// In-process repositories for local runs and tests
    pub fn in_memory() -> Self {
        Self {
            tokens: Arc::new(MockTokenRepository::new()),
            audit: Arc::new(MockAuditLogRepository::new()),
            queue: Arc::new(MockEventQueueRepository::new()),
            targets: Arc::new(MockDispatchTargetRepository::new()),
        }
    }

    /// MySQL repositories sharing one pool
    pub fn mysql(pool: &DatabasePool) -> Self {
        let pool = pool.get_pool().clone();
        Self {
            tokens: Arc::new(MySqlTokenRepository::new(pool.clone())),
            audit: Arc::new(MySqlAuditLogRepository::new(pool.clone())),
            queue: Arc::new(MySqlEventQueueRepository::new(pool.clone())),
            targets: Arc::new(MySqlDispatchTargetRepository::new(pool)),
        }
    }
}

/// Shared state handed to every handler
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub router: Arc<EventRouter>,
    pub status: Arc<StatusReporter>,
    pub liveness: Arc<dyn LivenessProvider>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        repositories: Repositories,
        auth: &AuthConfig,
        clock: Arc<dyn Clock>,
        liveness: Arc<dyn LivenessProvider>,
    ) -> Result<Self, DomainError> {
        let audit = Arc::new(AuditService::new(
            repositories.audit,
            clock.clone(),
            AuditServiceConfig::default(),
        ));

        let tokens = TokenService::new(
            repositories.tokens,
            CredentialVerifier::from_auth_config(auth),
            audit.clone(),
            clock.clone(),
            TokenServiceConfig::from_auth_config(auth),
        );

        let rules = RoutingTable::standard()?;
        let rule_count = rules.len();
        let router = EventRouter::new(
            repositories.queue.clone(),
            repositories.targets.clone(),
            rules,
            audit.clone(),
            clock.clone(),
        );

        let status = StatusReporter::new(
            repositories.queue,
            repositories.targets,
            liveness.clone(),
            audit,
            clock.clone(),
            rule_count,
        );

        if auth.webhook_secrets.is_empty() {
            log::warn!("No WEBHOOK_SECRET_* variables are set; token issuance will fail");
        }

        Ok(Self {
            tokens: Arc::new(tokens),
            router: Arc::new(router),
            status: Arc::new(status),
            liveness,
            clock,
        })
    }
}

/// Create and configure the application with all dependencies
pub fn create_app(
    app_state: web::Data<AppState>,
    cors: &CorsConfig,
    environment: Environment,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let json_config = web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(json_error_handler);

    App::new()
        .app_data(app_state)
        .app_data(json_config)
        // Registration order: CORS innermost, then request ids, then logging
        .wrap(create_cors(cors, environment))
        .wrap(RequestIdMiddleware)
        .wrap(Logger::new("%a \"%r\" %s %b %T %{x-request-id}o"))
        .configure(routes::configure)
        .default_service(web::to(not_found))
}
