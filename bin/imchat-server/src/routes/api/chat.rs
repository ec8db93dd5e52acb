use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::chat::{MessageBody, PullQuery, PullResponse, SendRequest, StatusResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(send_message, pull_messages),
    components(schemas(SendRequest, StatusResponse, PullResponse, MessageBody))
)]
pub struct ChatApi;

/// Register chat routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/send", post(send_message))
        .route("/pull", get(pull_messages))
}

/// Append one message to a chat.
#[utoipa::path(
    post,
    path = "/api/send",
    tag = "chat",
    request_body = SendRequest,
    responses(
        (status = 200, description = "Message stored", body = StatusResponse),
        (status = 400, description = "Invalid message, chat id, sender or send time", body = StatusResponse),
        (status = 500, description = "Storage failure", body = StatusResponse),
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ServerError> {
    let Json(req) = payload?;
    state.chat.send(req.into()).await?;
    Ok(Json(StatusResponse::success()))
}

/// Read one page of a chat starting at `cursor`.
#[utoipa::path(
    get,
    path = "/api/pull",
    tag = "chat",
    params(PullQuery),
    responses(
        (status = 200, description = "Page served", body = PullResponse),
        (status = 400, description = "Invalid chat id (1), limit (2) or cursor (3)", body = StatusResponse),
        (status = 500, description = "Storage failure", body = StatusResponse),
    )
)]
pub async fn pull_messages(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PullQuery>, QueryRejection>,
) -> Result<Json<PullResponse>, ServerError> {
    let Query(q) = query?;
    let page = state.chat.pull(q.into()).await?;
    Ok(Json(page.into()))
}
