//! Rate-limit admission middleware (spec §4.2).
//!
//! Applied after routing has resolved which backend family a request
//! belongs to; denial responds 429 with the standard body and always
//! emits `X-RateLimit-Limit` / `X-RateLimit-Remaining`.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sequencer_proto::HttpErrorEnvelope;

use super::request_id::RequestId;
use crate::config::RouteFamily;
use crate::ratelimit::{client_identity, RateLimiter};

#[derive(Clone)]
pub struct RateLimiters {
    pub rollup: RateLimiter,
    pub continuum_grpc: RateLimiter,
    pub continuum_rest: RateLimiter,
}

impl RateLimiters {
    fn for_family(&self, family: RouteFamily) -> &RateLimiter {
        match family {
            RouteFamily::Rollup => &self.rollup,
            RouteFamily::ContinuumGrpc => &self.continuum_grpc,
            RouteFamily::ContinuumRest => &self.continuum_rest,
        }
    }
}

/// Classifies a request path into the route family whose limiter governs
/// it (spec §2 "three route families").
pub fn classify_path(path: &str) -> Option<RouteFamily> {
    if path.starts_with("/api/v1/rollup") {
        Some(RouteFamily::Rollup)
    } else if path.starts_with("/api/v1/continuum/stream-ticks")
        || path.starts_with("/api/v1/continuum/transaction")
        || path.starts_with("/api/v1/continuum/tick")
        || path.starts_with("/api/v1/continuum/chain-state")
    {
        Some(RouteFamily::ContinuumGrpc)
    } else if path.starts_with("/api/v1/continuum") {
        Some(RouteFamily::ContinuumRest)
    } else {
        None
    }
}

pub async fn admit(State(limiters): State<RateLimiters>, request: Request, next: Next) -> Response {
    let Some(family) = classify_path(request.uri().path()) else {
        return next.run(request).await;
    };

    let identity = client_identity(
        request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok()),
        request.headers().get("x-real-ip").and_then(|v| v.to_str().ok()),
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .as_deref(),
    );

    let limiter = limiters.for_family(family);
    let allowed = limiter.allow(&identity).await;
    let (limit, remaining) = limiter.snapshot(&identity).await;

    if !allowed {
        let request_id = request.extensions().get::<RequestId>().map(|id| id.0.clone());
        let mut envelope = HttpErrorEnvelope::with_message(
            "Rate Limit Exceeded",
            "Too many requests. Please try again later.",
        );
        envelope.request_id = request_id;
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(envelope)).into_response();
        insert_rate_limit_headers(&mut response, limit, remaining);
        return response;
    }

    let mut response = next.run(request).await;
    insert_rate_limit_headers(&mut response, limit, remaining);
    response
}

fn insert_rate_limit_headers(response: &mut Response, limit: u32, remaining: u32) {
    response
        .headers_mut()
        .insert(header::HeaderName::from_static("x-ratelimit-limit"), HeaderValue::from(limit));
    response.headers_mut().insert(
        header::HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(remaining),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_path_routes_families_correctly() {
        assert_eq!(classify_path("/api/v1/rollup/markets"), Some(RouteFamily::Rollup));
        assert_eq!(
            classify_path("/api/v1/continuum/stream-ticks"),
            Some(RouteFamily::ContinuumGrpc)
        );
        assert_eq!(
            classify_path("/api/v1/continuum/tx/recent"),
            Some(RouteFamily::ContinuumRest)
        );
        assert_eq!(classify_path("/health"), None);
    }
}
