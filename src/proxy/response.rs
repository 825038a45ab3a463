// Caller-facing response construction

use axum::{
    body::Body,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use tracing::{debug, error};

use crate::proxy::common::headers::{build_response_headers, cors_headers};

/// Wrap an upstream response: status (and non-canonical reason phrase) kept,
/// headers replaced by CORS + allowlisted ones, body streamed without buffering.
pub fn build_inbound_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = build_response_headers(upstream.headers());
    let reason = upstream
        .extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .cloned();

    let stream = upstream.bytes_stream().inspect_err(|e| {
        // Headers are already sent at this point; the connection is cut
        error!("Upstream body stream failed: {}", e);
    });

    let mut response = assemble_response(status, headers, Body::from_stream(stream));
    if let Some(reason) = reason {
        response.extensions_mut().insert(reason);
    }
    response
}

fn assemble_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// CORS preflight answer: 204, no body, the four CORS headers.
pub fn preflight_response() -> Response {
    debug!("Answering CORS preflight");
    (StatusCode::NO_CONTENT, cors_headers()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    fn upstream(status: u16, headers: &[(&str, &str)], body: &'static str) -> reqwest::Response {
        let mut builder = axum::http::Response::builder().status(status);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        reqwest::Response::from(builder.body(body).unwrap())
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_passthrough_status_and_body() {
        let response = build_inbound_response(upstream(
            200,
            &[("content-type", "application/json")],
            r#"{"data":1}"#,
        ));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert!(response.headers().get(header::ETAG).is_none());
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
        assert_eq!(body_string(response).await, r#"{"data":1}"#);
    }

    #[tokio::test]
    async fn test_error_status_is_not_rewritten() {
        let response = build_inbound_response(upstream(
            503,
            &[
                ("cache-control", "no-store"),
                ("set-cookie", "tracking=1"),
                ("x-internal-host", "10.0.0.7"),
            ],
            "busy",
        ));

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(response.headers().get("x-internal-host").is_none());
        assert_eq!(body_string(response).await, "busy");
    }

    #[tokio::test]
    async fn test_preflight_response() {
        let response = preflight_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers().len(), 4);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_MAX_AGE).unwrap(),
            "86400"
        );
        assert!(body_string(response).await.is_empty());
    }
}
