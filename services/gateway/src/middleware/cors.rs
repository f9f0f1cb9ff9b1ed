//! CORS (spec §4.1.5).
//!
//! Hand-rolled rather than `tower_http::cors::CorsLayer` because the
//! pass-through-when-not-allowlisted and the exact `OPTIONS` 204 shape are
//! easier to state directly than to coax out of the generic layer.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

#[derive(Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

pub async fn apply(State(config): State<CorsConfig>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let Some(origin) = origin else {
        return next.run(request).await;
    };

    if !config.allowed_origins.iter().any(|allowed| allowed == &origin) {
        return next.run(request).await;
    }

    let is_preflight = request.method() == Method::OPTIONS;

    let mut response = if is_preflight {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
        );
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(
                "Accept, Content-Type, Content-Length, Accept-Encoding, Authorization, X-CSRF-Token",
            ),
        );
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
        response
    } else {
        next.run(request).await
    };

    if let Ok(value) = HeaderValue::from_str(&origin) {
        response.headers_mut().insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn app(allowed_origins: Vec<&str>) -> Router {
        let config = CorsConfig {
            allowed_origins: allowed_origins.into_iter().map(str::to_owned).collect(),
        };
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(config, apply))
    }

    #[tokio::test]
    async fn no_origin_header_passes_through_unchanged() {
        let response = app(vec!["https://allowed.example"])
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn disallowed_origin_emits_no_cors_headers() {
        let response = app(vec!["https://allowed.example"])
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header(header::ORIGIN, "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn allowed_origin_gets_origin_and_credentials_headers() {
        let response = app(vec!["https://allowed.example"])
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header(header::ORIGIN, "https://allowed.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://allowed.example"
        );
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn preflight_options_returns_204_with_method_and_header_allowlist() {
        let response = app(vec!["https://allowed.example"])
            .oneshot(
                HttpRequest::builder()
                    .method(Method::OPTIONS)
                    .uri("/")
                    .header(header::ORIGIN, "https://allowed.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_MAX_AGE).unwrap(),
            "86400"
        );
    }
}
