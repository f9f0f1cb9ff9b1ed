//! Panic recovery (spec §4.1.2).
//!
//! Traps any panic from a downstream handler and responds 500 with the
//! fixed generic body. The body must never contain the panic's raw
//! message or any payload beyond that fixed shape — this is an
//! information-disclosure property (spec §8 invariant 3, §9).

use std::panic::AssertUnwindSafe;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::FutureExt;
use sequencer_proto::HttpErrorEnvelope;
use tracing::error;

use super::request_id::RequestId;

pub async fn catch_panic(request: Request, next: Next) -> Response {
    let request_id = request.extensions().get::<RequestId>().cloned();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let message = panic_message(&panic);
            error!(request_id = ?request_id, panic = %message, "handler panicked, returning generic 500");

            let mut envelope =
                HttpErrorEnvelope::with_message("Internal Server Error", "An unexpected error occurred");
            envelope.request_id = request_id.map(|id| id.0);

            (StatusCode::INTERNAL_SERVER_ERROR, Json(envelope)).into_response()
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn panicking_handler() -> Response {
        panic!("PASSWORD: secret123");
    }

    #[tokio::test]
    async fn panic_response_never_leaks_the_panic_payload() {
        let app = Router::new()
            .route("/boom", get(panicking_handler))
            .layer(axum::middleware::from_fn(catch_panic))
            .layer(axum::middleware::from_fn(super::super::request_id::stamp));

        let response = app
            .oneshot(axum::http::Request::builder().uri("/boom").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let header_id = response
            .headers()
            .get(super::super::request_id::HEADER_NAME)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret123"));

        let envelope: HttpErrorEnvelope = serde_json::from_str(&text).unwrap();
        assert_eq!(envelope.error, "Internal Server Error");
        assert_eq!(envelope.message.as_deref(), Some("An unexpected error occurred"));
        assert_eq!(envelope.request_id.as_deref(), Some(header_id.as_str()));
    }
}
