//! Request-ID stamping (spec §4.1.1).
//!
//! Reuses an inbound `X-Request-ID` header when present; otherwise
//! generates 128 bits of randomness encoded as 32 lowercase hex
//! characters. The ID is stamped on both the request and response headers
//! and carried in the request's extensions under [`RequestId`], a
//! dedicated type rather than a string key so it cannot collide with
//! anything else stored there.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use rand::RngCore;

pub const HEADER_NAME: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }
}

pub async fn stamp(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(HEADER_NAME)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| RequestId(s.to_owned()))
        .unwrap_or_else(RequestId::generate);

    if let Ok(value) = HeaderValue::from_str(&id.0) {
        request.headers_mut().insert(HEADER_NAME, value.clone());
        request.extensions_mut().insert(id.clone());

        let mut response = next.run(request).await;
        response.headers_mut().insert(HEADER_NAME, value);
        response
    } else {
        next.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_32_lowercase_hex_chars() {
        let id = RequestId::generate();
        assert_eq!(id.0.len(), 32);
        assert!(id.0.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn generated_ids_are_collision_free_across_many_calls() {
        let mut seen = HashSet::new();
        for _ in 0..2000 {
            assert!(seen.insert(RequestId::generate().0));
        }
    }
}
