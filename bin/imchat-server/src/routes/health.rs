//! Liveness endpoint that also reports whether the message store answers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::{OpenApi, ToSchema};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(HealthResponse)))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// `"ok"` or `"unreachable"`.
    pub database: String,
    pub version: String,
}

/// Round-trips `SELECT 1` through the pool.
///
/// Answers 200 when the database responds and 503 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server and database are up", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let (status, database, code) = match state.chat.store().ping().await {
        Ok(()) => ("ok", "ok", StatusCode::OK),
        Err(e) => {
            warn!(error = %e, "health check: database unreachable");
            ("degraded", "unreachable", StatusCode::SERVICE_UNAVAILABLE)
        }
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_owned(),
            database: database.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use imchat_core::SqlStore;

    use crate::config;

    async fn state() -> Arc<AppState> {
        let store = SqlStore::in_memory().await.expect("open store");
        Arc::new(AppState::new(config::test_config(), Arc::new(store)))
    }

    #[tokio::test]
    async fn reachable_database_is_healthy() {
        let (code, Json(body)) = get_health(State(state().await)).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.database, "ok");
        assert!(!body.version.is_empty());
    }

    #[tokio::test]
    async fn closed_pool_reports_degraded() {
        let state = state().await;
        state.chat.store().close().await;
        let (code, Json(body)) = get_health(State(state)).await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert_eq!(body.database, "unreachable");
    }
}
