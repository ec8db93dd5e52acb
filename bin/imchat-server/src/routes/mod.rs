//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `IMCHAT_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - `/api/send` and `/api/pull`

mod api;
pub mod doc;
mod health;

use axum::{middleware, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .nest("/api", api::router());

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(&state.config)))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use imchat_core::SqlStore;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::test_config;
    use crate::middleware::trace::{MAX_REQUEST_BODY, X_TRACE_ID};

    async fn app() -> Router {
        app_with_store().await.0
    }

    async fn app_with_store() -> (Router, Arc<SqlStore>) {
        let store = Arc::new(SqlStore::in_memory().await.expect("open store"));
        let app = build(Arc::new(AppState::new(test_config(), Arc::clone(&store))));
        (app, store)
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.expect("infallible");
        let status = resp.status();
        let bytes = resp.into_body().collect().await.expect("body").to_bytes();
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    fn send(body: Value) -> Request<Body> {
        Request::post("/api/send")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn pull(query: &str) -> Request<Body> {
        Request::get(format!("/api/pull?{query}"))
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn send_then_pull_round_trip() {
        let app = app().await;
        for (i, (sender, text)) in [("alice", "hi"), ("bob", "hey"), ("alice", "sup")].iter().enumerate() {
            let (status, body) = call(
                &app,
                send(json!({"chat": "bob:alice", "sender": sender, "text": text, "send_time": i + 1})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"code": 0, "message": "success"}));
        }

        let (status, body) = call(&app, pull("chat=alice:bob&limit=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 0);
        assert_eq!(body["has_more"], true);
        assert_eq!(body["next_cursor"], 2);
        assert_eq!(
            body["messages"],
            json!([
                {"chat": "alice:bob", "text": "hi", "sender": "alice", "send_time": 1},
                {"chat": "alice:bob", "text": "hey", "sender": "bob", "send_time": 2},
            ])
        );

        let (_, body) = call(&app, pull("chat=alice:bob&cursor=2&limit=2")).await;
        assert_eq!(body["has_more"], false);
        assert!(body.get("next_cursor").is_none());
        assert_eq!(body["messages"][0]["text"], "sup");

        let (_, body) = call(&app, pull("chat=alice:bob&reverse=true&limit=1")).await;
        assert_eq!(body["messages"][0]["text"], "sup");
        assert_eq!(body["next_cursor"], 1);
    }

    #[tokio::test]
    async fn validation_failures_answer_400_with_codes() {
        let app = app().await;

        let (status, body) = call(&app, send(json!({"chat": "a:b", "sender": "c", "text": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"code": 1, "message": "invalid sender"}));

        let (status, body) = call(&app, pull("chat=nocolon")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 1);

        let (_, body) = call(&app, pull("chat=a:b&limit=-1")).await;
        assert_eq!(body, json!({"code": 2, "message": "invalid limit"}));

        let (_, body) = call(&app, pull("chat=a:b&cursor=-1")).await;
        assert_eq!(body, json!({"code": 3, "message": "invalid cursor"}));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn malformed_body_is_an_invalid_message() {
        let app = app().await;
        let req = Request::post("/api/send")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .expect("request");
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"code": 1, "message": "invalid message"}));
        assert!(logs_contain("rejected malformed request"));
    }

    #[tokio::test]
    async fn trace_id_is_echoed_or_assigned() {
        let app = app().await;
        let id = "6f1c0c7e-3d0b-4f43-9d55-0c9a0f7b2a11";
        let req = Request::get("/health")
            .header(X_TRACE_ID, id)
            .body(Body::empty())
            .expect("request");
        let resp = app.clone().oneshot(req).await.expect("infallible");
        assert_eq!(resp.headers()[X_TRACE_ID], id);

        let req = Request::get("/health").body(Body::empty()).expect("request");
        let resp = app.oneshot(req).await.expect("infallible");
        assert!(resp.headers().contains_key(X_TRACE_ID));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_with_413() {
        let app = app().await;
        let text = "x".repeat(MAX_REQUEST_BODY);
        let (status, body) = call(
            &app,
            send(json!({"chat": "a:b", "sender": "a", "text": text, "send_time": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({"code": 1, "message": "invalid message"}));

        let (status, _) = call(&app, pull("chat=a:b")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_reports_database_reachability() {
        let (app, store) = app_with_store().await;
        let req = || Request::get("/health").body(Body::empty()).expect("request");

        let (status, body) = call(&app, req()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "ok");

        store.close().await;
        let (status, body) = call(&app, req()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"], "unreachable");
    }
}
