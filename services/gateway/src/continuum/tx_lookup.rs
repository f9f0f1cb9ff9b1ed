//! Datastore-backed transaction lookups with REST fallback (spec §4.4
//! "Tx-by-hash with fallback", "Recent transactions").

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::config::deadlines;
use crate::http::response::{bad_request, not_found, service_unavailable};
use crate::rest_client::RestError;
use crate::state::AppState;

fn sanitize_hash(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-').collect()
}

fn validate_hash(hash: &str) -> Option<Response> {
    if hash.is_empty() || hash.len() > 128 {
        return Some(bad_request("hash must be non-empty and at most 128 characters"));
    }
    if !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Some(bad_request("hash must match ^[0-9A-Fa-f]+$"));
    }
    None
}

/// `GET /continuum/tx/:hash`.
pub async fn get_transaction_by_hash(State(state): State<AppState>, Path(raw_hash): Path<String>) -> Response {
    let hash = sanitize_hash(&raw_hash);
    if let Some(response) = validate_hash(&hash) {
        return response;
    }

    if let Some(pool) = &state.pool {
        match crate::repo::find_transaction_by_hash(pool, &hash).await {
            Ok(Some(row)) => {
                let mut response = Json(json!({ "source": "db", "data": row })).into_response();
                response.headers_mut().insert(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("private, max-age=1800"),
                );
                return response;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "datastore lookup failed, falling back to REST"),
        }
    }

    let path = format!("/tx/{hash}");
    match state.rest_client.get_json::<serde_json::Value>(&path, deadlines::REST_FETCH).await {
        Ok(data) => Json(json!({ "source": "continuum", "data": data })).into_response(),
        Err(RestError::NotFound) => not_found("transaction not found"),
        Err(e) => service_unavailable(describe(&e)),
    }
}

fn describe(e: &RestError) -> String {
    match e {
        RestError::Transport(err) => format!("transport error: {err}"),
        RestError::Status(status) => format!("upstream returned {status}"),
        RestError::NotFound => "not found".to_owned(),
    }
}

#[derive(Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    50
}

const DATA_SOURCE_HEADER: &str = "x-data-source";

/// `GET /continuum/tx/recent?limit=<1..1000>`. Never returns 500: an
/// absent or failing datastore degrades to an empty list (spec §4.4).
pub async fn recent_transactions(State(state): State<AppState>, Query(q): Query<RecentQuery>) -> Response {
    if !(1..=1000).contains(&q.limit) {
        return bad_request("limit must be between 1 and 1000");
    }

    let Some(pool) = &state.pool else {
        return unavailable_response();
    };

    match crate::repo::recent_transactions(pool, q.limit).await {
        Ok(rows) => {
            let count = rows.len();
            let mut response = Json(json!({ "transactions": rows, "count": count })).into_response();
            response.headers_mut().insert(
                axum::http::HeaderName::from_static(DATA_SOURCE_HEADER),
                HeaderValue::from_static("database"),
            );
            response
        }
        Err(e) => {
            tracing::warn!(error = %e, "recent transactions query failed");
            unavailable_response()
        }
    }
}

fn unavailable_response() -> Response {
    let mut response = Json(json!({
        "transactions": Vec::<serde_json::Value>::new(),
        "count": 0,
        "message": "datastore unavailable",
    }))
    .into_response();
    response.headers_mut().insert(
        axum::http::HeaderName::from_static(DATA_SOURCE_HEADER),
        HeaderValue::from_static("database_unavailable"),
    );
    *response.status_mut() = StatusCode::OK;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_hash_strips_disallowed_characters() {
        assert_eq!(sanitize_hash("abc123!@#"), "abc123");
    }

    #[test]
    fn validate_hash_rejects_non_hex() {
        assert!(validate_hash("zz").is_some());
        assert!(validate_hash("").is_some());
        assert!(validate_hash(&"a".repeat(129)).is_some());
        assert!(validate_hash("deadBEEF").is_none());
    }
}
