//! Shared JSON error envelope helpers (spec §4.1.2, §7).
//!
//! Every non-2xx gateway response shares the minimal `{error, message, ...}`
//! shape; these helpers generalize the teacher's `server::http::response`
//! module (`{code, message, details}`) to that shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sequencer_proto::HttpErrorEnvelope;

pub type HttpResult<T = Response> = Result<T, Response>;

pub fn json_error(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Response {
    (status, Json(HttpErrorEnvelope::with_message(error, message))).into_response()
}

pub fn bad_request(message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, "bad request", message)
}

pub fn not_found(message: impl Into<String>) -> Response {
    json_error(StatusCode::NOT_FOUND, "not found", message)
}

pub fn bad_gateway(message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_GATEWAY, "bad gateway", message)
}

pub fn gateway_timeout(message: impl Into<String>) -> Response {
    json_error(StatusCode::GATEWAY_TIMEOUT, "gateway timeout", message)
}

pub fn service_unavailable(message: impl Into<String>) -> Response {
    json_error(StatusCode::SERVICE_UNAVAILABLE, "service unavailable", message)
}

pub fn internal_error(message: impl Into<String>) -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error", message)
}
