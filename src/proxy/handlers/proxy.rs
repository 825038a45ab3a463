// Proxy Handler
use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};

use crate::error::ProxyError;
use crate::proxy::request::{build_outbound_request, carries_body, resolve_target, ProxyRequest};
use crate::proxy::response::{build_inbound_response, preflight_response};
use crate::proxy::server::AppState;

/// Every method on `/proxy/:target[/*]`. OPTIONS is a preflight, answered
/// locally without checking the target; everything else is forwarded.
pub async fn handle_proxy(State(state): State<AppState>, request: Request) -> Response {
    if request.method() == Method::OPTIONS {
        return preflight_response();
    }

    match forward(&state, request).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                ProxyError::InvalidTarget(target) => {
                    warn!("Rejected invalid proxy target: {}", target)
                }
                ProxyError::UpstreamFailure(cause) => error!("Proxy request failed: {}", cause),
            }
            err.into_response()
        }
    }
}

async fn forward(state: &AppState, request: Request) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    // Router captures are not trusted; the raw path is re-matched
    let Some(mut proxy_request) = ProxyRequest::from_parts(&parts.method, &parts.uri, &parts.headers)
    else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let base_url = resolve_target(&state.allowlist, &proxy_request.target)?;

    if carries_body(&proxy_request.method) {
        let bytes = axum::body::to_bytes(body, state.max_body_bytes)
            .await
            .map_err(|e| ProxyError::UpstreamFailure(format!("Failed to read request body: {}", e)))?;
        proxy_request.body = Some(bytes);
    }

    let outbound = build_outbound_request(&proxy_request, base_url, &state.identity);
    info!("Proxying {} {}", outbound.method, outbound.url);

    let upstream = state.upstream.send(outbound).await?;
    Ok(build_inbound_response(upstream))
}
