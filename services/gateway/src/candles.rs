//! `GET /api/v1/rollup/markets/:marketId/candles` (spec §4.5).

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::http::response::{bad_request, internal_error};
use crate::state::AppState;

const VALID_TIMEFRAMES: &[&str] = &["1m", "5m", "15m", "1h", "4h", "1d"];

#[derive(Deserialize)]
pub struct CandlesQuery {
    #[serde(default = "default_tf")]
    tf: String,
    from: Option<String>,
    to: Option<String>,
    since: Option<i64>,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_tf() -> String {
    "1h".to_owned()
}

fn default_limit() -> i64 {
    500
}

pub async fn get_candles(
    State(state): State<AppState>,
    Path(market_id): Path<Uuid>,
    Query(query): Query<CandlesQuery>,
) -> Response {
    if !VALID_TIMEFRAMES.contains(&query.tf.as_str()) {
        return bad_request("tf must be one of 1m, 5m, 15m, 1h, 4h, 1d");
    }
    if !(1..=1000).contains(&query.limit) {
        return bad_request("limit must be between 1 and 1000");
    }

    let now = Utc::now();
    let default_from = now - ChronoDuration::hours(24);

    let to = match query.to.as_deref().map(DateTime::parse_from_rfc3339) {
        Some(Ok(dt)) => dt.with_timezone(&Utc),
        Some(Err(_)) => return bad_request("to must be RFC3339"),
        None => now,
    };

    let suppress_cache = query.since.is_some();
    let from = if let Some(since_ms) = query.since {
        match DateTime::from_timestamp_millis(since_ms + 1) {
            Some(dt) => dt,
            None => return bad_request("since must be a valid Unix millisecond timestamp"),
        }
    } else {
        match query.from.as_deref().map(DateTime::parse_from_rfc3339) {
            Some(Ok(dt)) => dt.with_timezone(&Utc),
            Some(Err(_)) => return bad_request("from must be RFC3339"),
            None => default_from,
        }
    };

    if from > to {
        return bad_request("from must not be after to");
    }
    if to - from > ChronoDuration::days(30) {
        return bad_request("the [from, to] window must not exceed 30 days");
    }

    let Some(pool) = &state.pool else {
        return internal_error("datastore not configured");
    };

    let candles = match crate::repo::candles(pool, market_id, &query.tf, from, to, query.limit).await {
        Ok(candles) => candles,
        Err(e) => return internal_error(format!("candle query failed: {e}")),
    };

    let last_ts = candles.last().map(|c| c.bucket_start.timestamp_millis());
    let body = candles.into_iter().map(|c| c.to_array()).collect::<Vec<_>>();

    let mut response = Json(body).into_response();
    response
        .headers_mut()
        .insert(header::HeaderName::from_static("x-data-source"), HeaderValue::from_static("database"));
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        if suppress_cache {
            HeaderValue::from_static("no-cache")
        } else {
            HeaderValue::from_static("public, max-age=5")
        },
    );
    if let Some(ts) = last_ts {
        if let Ok(value) = HeaderValue::from_str(&ts.to_string()) {
            response
                .headers_mut()
                .insert(header::HeaderName::from_static("x-last-candle-timestamp"), value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_timeframes_cover_the_spec_set() {
        for tf in ["1m", "5m", "15m", "1h", "4h", "1d"] {
            assert!(VALID_TIMEFRAMES.contains(&tf));
        }
        assert!(!VALID_TIMEFRAMES.contains(&"2h"));
    }
}
