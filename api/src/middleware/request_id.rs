//! Request id propagation.
//!
//! The caller's `X-Request-Id` is kept when present, otherwise a UUID is
//! generated. The id is stored in the request extensions for handlers, audit
//! rows and error envelopes, and echoed on every response.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue, USER_AGENT},
    Error, HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use uuid::Uuid;

use mcp_core::domain::entities::audit::RequestContext;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id that is echoed back
const MAX_REQUEST_ID_LEN: usize = 64;

/// Request id stored in the request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Middleware assigning a request id to every request
pub struct RequestIdMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RequestIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestIdMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestIdMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestIdMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        req.extensions_mut().insert(RequestId(request_id.clone()));

        Box::pin(async move {
            let mut res = service.call(req).await?;

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            Ok(res)
        })
    }
}

/// Request id assigned by [`RequestIdMiddleware`], or a fresh one outside it
pub fn request_id_of(req: &HttpRequest) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Audit metadata for the request
pub fn request_context(req: &HttpRequest) -> RequestContext {
    let ip_address = req
        .connection_info()
        .realip_remote_addr()
        .map(String::from);
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    RequestContext::new(req.method().as_str(), req.path())
        .with_request_id(request_id_of(req))
        .with_client(ip_address, user_agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    #[actix_web::test]
    async fn test_generates_and_echoes_request_id() {
        let app = test::init_service(
            App::new()
                .wrap(RequestIdMiddleware)
                .route("/", web::get().to(|req: HttpRequest| async move {
                    HttpResponse::Ok().body(request_id_of(&req))
                })),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((REQUEST_ID_HEADER, "trace-123"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.headers().get(REQUEST_ID_HEADER).unwrap(), "trace-123");
        assert_eq!(test::read_body(res).await, "trace-123");

        let req = test::TestRequest::get().uri("/").to_request();
        let res = test::call_service(&app, req).await;
        let generated = res.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(generated).is_ok());
    }

    #[actix_web::test]
    async fn test_path_routes_and_error_responses_carry_request_id() {
        let app = test::init_service(
            App::new()
                .wrap(RequestIdMiddleware)
                .route(
                    "/items/{id}",
                    web::get().to(|path: web::Path<String>| async move {
                        HttpResponse::Ok().body(path.into_inner())
                    }),
                )
                .route(
                    "/broken",
                    web::get().to(|| async {
                        Err::<HttpResponse, _>(actix_web::error::ErrorBadRequest("bad"))
                    }),
                ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/items/42")
            .insert_header((REQUEST_ID_HEADER, "trace-9"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.status().is_success());
        assert_eq!(res.headers().get(REQUEST_ID_HEADER).unwrap(), "trace-9");
        assert_eq!(test::read_body(res).await, "42");

        let req = test::TestRequest::get().uri("/broken").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::BAD_REQUEST);
        assert!(res.headers().contains_key(REQUEST_ID_HEADER));

        let req = test::TestRequest::get().uri("/missing").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::NOT_FOUND);
        assert!(res.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[actix_web::test]
    async fn test_request_context_carries_client_metadata() {
        let req = test::TestRequest::post()
            .uri("/mcp-auth/token")
            .insert_header((USER_AGENT, "minu-find/1.2"))
            .peer_addr("10.1.2.3:5555".parse().unwrap())
            .to_http_request();
        req.extensions_mut().insert(RequestId("req-7".to_string()));

        let ctx = request_context(&req);
        assert_eq!(ctx.method, "POST");
        assert_eq!(ctx.endpoint, "/mcp-auth/token");
        assert_eq!(ctx.request_id, "req-7");
        assert_eq!(ctx.user_agent.as_deref(), Some("minu-find/1.2"));
        assert!(ctx.ip_address.unwrap().starts_with("10.1.2.3"));
    }
}
