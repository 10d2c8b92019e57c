//! Routing fallbacks, request ids, CORS and the health check

mod common;

#[cfg(test)]
mod tests {
    use actix_web::{
        http::{header, Method, StatusCode},
        test,
    };
    use serde_json::json;

    use crate::common::{send, TestHub};

    #[actix_web::test]
    async fn test_unknown_path_is_not_found() {
        let hub = TestHub::new();
        let app = test::init_service(hub.app()).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/nope").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let request_id = resp.headers().get("x-request-id").cloned();

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(
            body["error"]["request_id"].as_str(),
            request_id.as_ref().and_then(|v| v.to_str().ok())
        );
        assert!(body["error"]["timestamp"].is_string());
    }

    #[actix_web::test]
    async fn test_wrong_method_is_not_allowed() {
        let hub = TestHub::new();
        let app = test::init_service(hub.app()).await;

        for (method, uri) in [
            (Method::GET, "/mcp-auth/token"),
            (Method::GET, "/mcp-auth/verify"),
            (Method::DELETE, "/mcp-auth/revoke"),
            (Method::GET, "/mcp-router/dispatch"),
            (Method::POST, "/mcp-router/status"),
            (Method::POST, "/health"),
        ] {
            let req = test::TestRequest::default().method(method.clone()).uri(uri).to_request();
            let (status, body) = send(&app, req).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{} {}", method, uri);
            assert_eq!(body["error"]["code"], "method_not_allowed");
        }
    }

    #[actix_web::test]
    async fn test_request_id_is_echoed_or_generated() {
        let hub = TestHub::new();
        let app = test::init_service(hub.app()).await;

        let req = test::TestRequest::get()
            .uri("/health")
            .insert_header(("X-Request-Id", "trace-123"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.headers().get("x-request-id").unwrap(), "trace-123");

        // Also on errors raised by middleware
        let req = test::TestRequest::get()
            .uri("/mcp-router/status")
            .insert_header(("X-Request-Id", "trace-456"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get("x-request-id").unwrap(), "trace-456");
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "missing_authorization");
        assert_eq!(body["error"]["request_id"], "trace-456");

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        let generated = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(generated).is_ok());
    }

    #[actix_web::test]
    async fn test_health_reports_uptime() {
        let hub = TestHub::new();
        let app = test::init_service(hub.app()).await;
        hub.clock.advance(chrono::Duration::seconds(7));

        let (status, body) = send(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "mcp-hub");
        assert_eq!(body["uptime_seconds"], 7);
    }

    #[actix_web::test]
    async fn test_malformed_json_uses_error_envelope() {
        let hub = TestHub::new();
        let app = test::init_service(hub.app()).await;

        let req = test::TestRequest::post()
            .uri("/mcp-auth/verify")
            .insert_header(header::ContentType::json())
            .set_payload("{not json")
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");
    }

    #[actix_web::test]
    async fn test_bearer_rejects_garbage_tokens() {
        let hub = TestHub::new();
        let app = test::init_service(hub.app()).await;

        let req = test::TestRequest::post()
            .uri("/mcp-router/dispatch")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .set_json(json!({"event_type": "x", "source_service": "minu-find", "payload": {}}))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "invalid_token");
    }

    #[actix_web::test]
    async fn test_cors_preflight_on_router() {
        let hub = TestHub::new();
        let app = test::init_service(hub.app()).await;

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/mcp-router/dispatch")
            .insert_header((header::ORIGIN, "https://console.minu.dev"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization, x-idempotency-key"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert!(resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        assert!(resp.headers().contains_key("x-request-id"));
    }
}
