// Header allowlists and CORS headers
// Only names listed here ever cross the gateway, in either direction.

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

/// Fixed User-Agent presented to every upstream
pub const GATEWAY_USER_AGENT: &str = concat!("proxy-gateway/", env!("CARGO_PKG_VERSION"));

/// Inbound request headers copied to the upstream request
pub const REQUEST_HEADER_ALLOWLIST: [HeaderName; 6] = [
    header::CONTENT_TYPE,
    header::ACCEPT,
    HeaderName::from_static("x-api-key"),
    HeaderName::from_static("x-request-id"),
    HeaderName::from_static("x-request-source"),
    header::AUTHORIZATION,
];

/// Upstream response headers copied back to the caller
pub const RESPONSE_HEADER_ALLOWLIST: [HeaderName; 5] = [
    header::CONTENT_TYPE,
    header::CONTENT_ENCODING,
    header::CACHE_CONTROL,
    header::ETAG,
    header::LAST_MODIFIED,
];

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization, X-API-Key, X-Request-Id";
pub const CORS_MAX_AGE: &str = "86400";

/// Identity the gateway presents upstream instead of the caller's
#[derive(Debug, Clone)]
pub struct GatewayIdentity {
    pub origin: HeaderValue,
    pub referer: HeaderValue,
    pub user_agent: HeaderValue,
}

impl GatewayIdentity {
    /// `public_origin` must already be validated as an http(s) origin.
    pub fn new(public_origin: &str) -> Result<Self, header::InvalidHeaderValue> {
        let origin = public_origin.trim_end_matches('/');
        Ok(Self {
            origin: HeaderValue::from_str(origin)?,
            referer: HeaderValue::from_str(&format!("{}/", origin))?,
            user_agent: HeaderValue::from_static(GATEWAY_USER_AGENT),
        })
    }
}

/// The four CORS headers attached to preflights and forwarded responses
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(4 + RESPONSE_HEADER_ALLOWLIST.len());
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(CORS_ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(CORS_MAX_AGE),
    );
    headers
}

/// Fresh outbound header set: gateway identity first, then allowlisted inbound headers.
pub fn build_outbound_headers(inbound: &HeaderMap, identity: &GatewayIdentity) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ORIGIN, identity.origin.clone());
    headers.insert(header::REFERER, identity.referer.clone());
    headers.insert(header::USER_AGENT, identity.user_agent.clone());

    copy_allowed(inbound, &mut headers, &REQUEST_HEADER_ALLOWLIST);
    headers
}

/// Fresh caller-facing header set: CORS headers, then allowlisted upstream headers.
pub fn build_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = cors_headers();
    copy_allowed(upstream, &mut headers, &RESPONSE_HEADER_ALLOWLIST);
    headers
}

fn copy_allowed(from: &HeaderMap, to: &mut HeaderMap, allowlist: &[HeaderName]) {
    for name in allowlist {
        for value in from.get_all(name) {
            to.append(name.clone(), value.clone());
        }
    }
}
