//! Bearer authentication middleware for protected endpoints.
//!
//! Extracts the access token from the Authorization header and verifies it
//! through the same `TokenService` check used by `/mcp-auth/verify`,
//! including the revocation lookup. On success the verified identity is
//! injected into the request as an [`AuthContext`].

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    ops::Deref,
    rc::Rc,
    task::{Context, Poll},
};

use mcp_core::domain::entities::token::TokenVerification;
use mcp_core::errors::{AuthError, DomainError};

use crate::app::AppState;
use crate::handlers::error::ApiError;
use crate::middleware::request_id::{request_context, request_id_of};

/// Verified caller injected into protected requests
#[derive(Debug, Clone)]
pub struct AuthContext(pub TokenVerification);

impl Deref for AuthContext {
    type Target = TokenVerification;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Bearer authentication middleware factory
#[derive(Debug, Clone, Default)]
pub struct BearerAuth {
    required_scopes: Vec<&'static str>,
}

impl BearerAuth {
    /// Any valid access token
    pub fn new() -> Self {
        Self::default()
    }

    /// A valid access token holding every listed scope
    pub fn with_scopes(scopes: &[&'static str]) -> Self {
        Self {
            required_scopes: scopes.to_vec(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthMiddleware {
            service: Rc::new(service),
            required_scopes: Rc::new(self.required_scopes.clone()),
        }))
    }
}

/// Bearer authentication middleware service
pub struct BearerAuthMiddleware<S> {
    service: Rc<S>,
    required_scopes: Rc<Vec<&'static str>>,
}

impl<S, B> Service<ServiceRequest> for BearerAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_scopes = Rc::clone(&self.required_scopes);

        Box::pin(async move {
            let request_id = request_id_of(req.request());

            let token = match extract_bearer_token(&req) {
                Some(token) => token,
                None => {
                    let error: DomainError = AuthError::MissingAuthorization.into();
                    return Ok(reject(req, ApiError::from_domain(&error, request_id)));
                }
            };

            let state = match req.app_data::<web::Data<AppState>>().cloned() {
                Some(state) => state,
                None => {
                    log::error!("AppState is not registered; rejecting {}", req.path());
                    let error = DomainError::internal("authentication is not configured");
                    return Ok(reject(req, ApiError::from_domain(&error, request_id)));
                }
            };

            let ctx = request_context(req.request());
            match state
                .tokens
                .authenticate(&token, required_scopes.as_slice(), &ctx)
                .await
            {
                Ok(verification) => {
                    req.extensions_mut().insert(AuthContext(verification));
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(error) => Ok(reject(req, ApiError::from_domain(&error, request_id))),
            }
        })
    }
}

fn reject<B>(req: ServiceRequest, error: ApiError) -> ServiceResponse<EitherBody<B>> {
    req.into_response(error.error_response()).map_into_right_body()
}

/// Extracts Bearer token from Authorization header
fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Extractor for the authenticated caller
impl FromRequest for AuthContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let result = req.extensions().get::<AuthContext>().cloned().ok_or_else(|| {
            let error: DomainError = AuthError::MissingAuthorization.into();
            ApiError::from_domain(&error, request_id_of(req)).into()
        });

        ready(result)
    }
}
