//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so failures become a `{code, message}`
//! JSON body with a matching HTTP status.
//!
//! Store failures are logged where they happen (in the chat service) and
//! reach the caller only as the generic failure text.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use imchat_core::error::GENERIC_FAILURE;
use imchat_core::{ServiceError, ValidationError};
use thiserror::Error;
use tracing::{debug, error};

use crate::schemas::chat::StatusResponse;

/// All errors that can occur in the imchat-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the chat service (validation or storage).
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The request body or query string could not be decoded at all.
    /// Reported to the caller as an invalid message.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// The request body exceeded the size limit.
    #[error("request body too large: {0}")]
    TooLarge(String),

    /// Failure outside the chat service, e.g. reading a response body.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn code(&self) -> i32 {
        match self {
            ServerError::Service(e) => e.code(),
            ServerError::Malformed(_) | ServerError::TooLarge(_) => {
                ValidationError::InvalidMessage.code()
            }
            ServerError::Internal(_) => -1,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Service(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ServerError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Malformed(_) => StatusCode::BAD_REQUEST,
            ServerError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        match self {
            ServerError::Service(e) => e.client_message(),
            ServerError::Malformed(_) | ServerError::TooLarge(_) => {
                ValidationError::InvalidMessage.to_string()
            }
            ServerError::Internal(_) => GENERIC_FAILURE.to_owned(),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::Malformed(rejection.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::Malformed(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match &self {
            ServerError::Malformed(detail) | ServerError::TooLarge(detail) => {
                debug!(%detail, "rejected malformed request");
            }
            ServerError::Internal(detail) => error!(%detail, "request failed"),
            ServerError::Service(_) => {}
        }
        let body = StatusResponse {
            code: self.code(),
            message: self.client_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
