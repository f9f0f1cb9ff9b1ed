//! Metric observation (spec §4.1.4).
//!
//! Wraps the response body in a byte-counting stream so
//! `response_size_bytes` reflects what was actually written, including
//! for chunked SSE responses where no `Content-Length` is ever set. The
//! wrapper is transparent to flushing: it only inspects frames as they
//! pass, never buffers them.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::middleware::Next;
use axum::response::Response;
use http_body::{Body as HttpBody, Frame};
use pin_project_lite::pin_project;

use crate::metrics::GatewayMetrics;

pub async fn observe(State(metrics): State<Arc<GatewayMetrics>>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_owned();

    if let Some(len) = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
    {
        metrics
            .request_size_bytes
            .with_label_values(&[&method, &path])
            .observe(len);
    }

    let started = Instant::now();
    let response = next.run(request).await;
    let status = response.status().as_u16().to_string();

    let (parts, body) = response.into_parts();
    let counting = CountingBody {
        inner: body,
        method,
        path,
        status,
        started,
        metrics,
    };
    Response::from_parts(parts, Body::new(counting))
}

pin_project! {
    struct CountingBody {
        #[pin]
        inner: Body,
        method: String,
        path: String,
        status: String,
        started: Instant,
        metrics: Arc<GatewayMetrics>,
    }
}

impl HttpBody for CountingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        match this.inner.as_mut().poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.metrics
                        .response_size_bytes
                        .with_label_values(&[this.method, this.path, this.status])
                        .observe(data.len() as f64);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(None) => {
                this.metrics
                    .requests_total
                    .with_label_values(&[this.method, this.path, this.status])
                    .inc();
                this.metrics
                    .request_duration_seconds
                    .with_label_values(&[this.method, this.path, this.status])
                    .observe(this.started.elapsed().as_secs_f64());
                Poll::Ready(None)
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn observes_request_count_and_response_bytes() {
        let metrics = Arc::new(GatewayMetrics::new());
        let app = Router::new()
            .route("/hello", get(|| async { "hi there" }))
            .layer(axum::middleware::from_fn_with_state(metrics.clone(), observe));

        let response = app
            .oneshot(axum::http::Request::builder().uri("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hi there");

        let families = metrics.registry.gather();
        let requests_total = families.iter().find(|f| f.get_name() == "requests_total").unwrap();
        assert_eq!(requests_total.get_metric()[0].get_counter().get_value(), 1.0);
    }
}
