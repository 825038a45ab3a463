// Request logging middleware
use axum::{extract::Request, middleware::Next, response::Response};
use tracing::Instrument;

/// Wrap each request in a span carrying a fresh request id
pub async fn request_span_middleware(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let response = next.run(request).await;
        tracing::debug!(status = %response.status(), "Request finished");
        response
    }
    .instrument(span)
    .await
}
