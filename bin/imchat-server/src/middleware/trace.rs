use axum::{
    body::{self, Body, Bytes},
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::ServerError;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Bodies at most this large are logged verbatim at `debug`.
const MAX_LOGGED_BODY: usize = 1024;

/// Largest request body buffered; matches axum's default extractor limit.
pub const MAX_REQUEST_BODY: usize = 2 * 1024 * 1024;

/// Tags each request with a trace id (taken from `x-trace-id` when it is a
/// UUID, freshly generated otherwise), echoes it on the response, and logs
/// status and latency inside an `http_request` span.
pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        debug!("→ request started");
        let (parts, body) = req.into_parts();
        let mut response = match buffer_and_log("request", &parts.headers, body, MAX_REQUEST_BODY).await {
            Ok(req_bytes) => {
                let mut req = Request::from_parts(parts, Body::from(req_bytes));
                if let Some(v) = &header_value {
                    req.headers_mut().insert(X_TRACE_ID, v.clone());
                }
                log_response(next.run(req).await).await
            }
            Err(err) => request_body_error(err).into_response(),
        };
        if let Some(v) = header_value {
            response.headers_mut().insert(X_TRACE_ID, v);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );

        response
    }
    .instrument(span)
    .await
}

/// Buffers JSON responses so they can be logged; other bodies stream through.
async fn log_response(response: Response) -> Response {
    if !is_json(response.headers()) {
        return response;
    }
    let (parts, body) = response.into_parts();
    match buffer_and_log("response", &parts.headers, body, usize::MAX).await {
        Ok(bytes) => Response::from_parts(parts, Body::from(bytes)),
        Err(err) => ServerError::Internal(err.to_string()).into_response(),
    }
}

fn request_body_error(err: axum::Error) -> ServerError {
    let detail = err.to_string();
    if err.into_inner().downcast_ref::<LengthLimitError>().is_some() {
        ServerError::TooLarge(detail)
    } else {
        ServerError::Malformed(detail)
    }
}

fn is_json(headers: &header::HeaderMap) -> bool {
    content_type(headers).contains("application/json")
}

fn content_type(headers: &header::HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

async fn buffer_and_log(
    direction: &str,
    headers: &header::HeaderMap,
    body: Body,
    limit: usize,
) -> Result<Bytes, axum::Error> {
    let content_type = content_type(headers);
    let bytes = body::to_bytes(body, limit).await?;

    if content_type.contains("application/json") && bytes.len() <= MAX_LOGGED_BODY {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            debug!(direction, body = text, "json body");
        }
    } else if !bytes.is_empty() {
        debug!(direction, content_type, size = bytes.len(), "body skipped");
    }

    Ok(bytes)
}
