//! Streaming HTTP reverse proxy (spec §4.3).
//!
//! One shared `reqwest::Client` per backend origin, with the connection
//! pool limits spec.md names. The proxy never strips a routed prefix
//! itself — callers pass the already-stripped downstream path.

use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::Client;

use crate::http::response::{bad_gateway, gateway_timeout};

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

#[derive(Clone)]
pub struct ReverseProxy {
    client: Client,
    base_url: String,
}

impl ReverseProxy {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build reverse proxy HTTP client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Proxies `request` to `self.base_url + downstream_path`, preserving
    /// the incoming raw query string.
    pub async fn forward(&self, request: Request, downstream_path: &str) -> Response {
        let method = request.method().clone();
        let query = request.uri().query().map(str::to_owned);
        let client_ip = client_ip(request.headers());
        let forwarded_proto = forwarded_proto(request.headers());
        let forwarded_host = request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_owned();

        let mut target = format!("{}{}", self.base_url, downstream_path);
        if let Some(query) = query {
            target.push('?');
            target.push_str(&query);
        }

        let headers = filter_hop_by_hop(request.headers());
        let body_stream = request.into_body().into_data_stream();

        let mut upstream_request = self
            .client
            .request(reqwest_method(&method), &target)
            .headers(headers)
            .body(reqwest::Body::wrap_stream(body_stream));

        upstream_request = upstream_request
            .header("x-forwarded-for", client_ip)
            .header("x-forwarded-proto", forwarded_proto)
            .header("x-forwarded-host", forwarded_host);

        match upstream_request.send().await {
            Ok(upstream_response) => into_axum_response(upstream_response).await,
            Err(e) => {
                if e.is_timeout() {
                    gateway_timeout("gateway timeout")
                } else {
                    bad_gateway("bad gateway")
                }
            }
        }
    }
}

fn reqwest_method(method: &Method) -> reqwest::Method {
    reqwest::Method::from_bytes(method.as_str().as_bytes()).unwrap_or(reqwest::Method::GET)
}

fn filter_hop_by_hop(headers: &HeaderMap) -> reqwest::header::HeaderMap {
    let mut out = reqwest::header::HeaderMap::new();
    for (name, value) in headers {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes()),
            reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            out.insert(name, value);
        }
    }
    out
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_owned()
}

fn forwarded_proto(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http")
        .to_owned()
}

async fn into_axum_response(upstream: reqwest::Response) -> Response {
    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.insert(name, value);
        }
    }

    let stream = upstream.bytes_stream();
    let mut response = Body::from_stream(stream).into_response();
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_by_hop_headers_are_filtered() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let filtered = filter_hop_by_hop(&headers);
        assert!(!filtered.contains_key("connection"));
        assert!(filtered.contains_key("content-type"));
    }

    #[test]
    fn client_ip_takes_first_forwarded_value() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4, 5.6.7.8"));
        assert_eq!(client_ip(&headers), "1.2.3.4");
    }
}
