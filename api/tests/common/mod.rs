//! Shared fixtures for the HTTP integration tests
#![allow(dead_code)]

use std::sync::Arc;

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse},
    http::{header::ContentType, StatusCode},
    test, web, App,
};
use chrono::Utc;
use serde_json::{json, Value};

use mcp_api::{create_app, AppState, Repositories};
use mcp_core::repositories::{
    MockAuditLogRepository, MockDispatchTargetRepository, MockEventQueueRepository,
    MockTokenRepository,
};
use mcp_core::services::clock::{Clock, FixedClock, InstanceLiveness};
use mcp_core::services::token::sign;
use mcp_shared::config::{AuthConfig, CorsConfig, Environment, WebhookSecrets};

pub const JWT_SECRET: &str = "http-integration-jwt-secret-0123456789";
pub const FIND_SECRET: &str = "minu-find-webhook-secret";
pub const BUILD_SECRET: &str = "minu-build-webhook-secret";

/// In-memory hub with handles on every repository
pub struct TestHub {
    pub state: web::Data<AppState>,
    pub clock: Arc<FixedClock>,
    pub tokens: MockTokenRepository,
    pub audit: MockAuditLogRepository,
    pub queue: MockEventQueueRepository,
    pub targets: MockDispatchTargetRepository,
}

impl TestHub {
    pub fn new() -> Self {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let tokens = MockTokenRepository::new();
        let audit = MockAuditLogRepository::new();
        let queue = MockEventQueueRepository::new();
        let targets = MockDispatchTargetRepository::with_admins(["admin-1", "admin-2"]);

        let repositories = Repositories {
            tokens: Arc::new(tokens.clone()),
            audit: Arc::new(audit.clone()),
            queue: Arc::new(queue.clone()),
            targets: Arc::new(targets.clone()),
        };
        let auth = AuthConfig::with_secret(JWT_SECRET).with_webhook_secrets(
            WebhookSecrets::new()
                .with_secret("minu-find", FIND_SECRET)
                .with_secret("minu-build", BUILD_SECRET),
        );
        let liveness = Arc::new(InstanceLiveness::new(clock.now()));
        let state = AppState::new(repositories, &auth, clock.clone(), liveness)
            .expect("standard routing table compiles");

        Self {
            state: web::Data::new(state),
            clock,
            tokens,
            audit,
            queue,
            targets,
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        create_app(
            self.state.clone(),
            &CorsConfig::default(),
            Environment::Development,
        )
    }

    /// Signed `POST /mcp-auth/token` for a provisioned service
    pub fn token_request(&self, service_id: &str, scope: &str) -> test::TestRequest {
        let secret = match service_id {
            "minu-build" => BUILD_SECRET,
            _ => FIND_SECRET,
        };
        let body = json!({
            "grant_type": "service_credentials",
            "client_id": format!("{}-client", service_id),
            "scope": scope,
        })
        .to_string();

        signed_token_request(service_id, secret, body, self.clock.now().timestamp())
    }
}

pub fn signed_token_request(
    service_id: &str,
    secret: &str,
    body: String,
    timestamp: i64,
) -> test::TestRequest {
    let signature = sign(secret.as_bytes(), body.as_bytes());
    test::TestRequest::post()
        .uri("/mcp-auth/token")
        .insert_header(("X-Service-Id", service_id))
        .insert_header(("X-Signature", signature))
        .insert_header(("X-Timestamp", timestamp.to_string()))
        .insert_header(ContentType::json())
        .set_payload(body)
}

pub fn bearer(token: &Value) -> (&'static str, String) {
    (
        "Authorization",
        format!("Bearer {}", token.as_str().unwrap_or_default()),
    )
}

/// Call the app and decode the JSON body (`Null` when empty)
pub async fn send<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}
