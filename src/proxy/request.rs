// Outbound request construction
// Pure: no network I/O happens here, the upstream client sends what this builds.

use axum::http::{HeaderMap, Method, Uri};
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ProxyError;
use crate::proxy::common::headers::{build_outbound_headers, GatewayIdentity};
use crate::proxy::targets::TargetAllowlist;

/// `/proxy/{target}` with an optional `/{rest}` tail. `rest` may be empty.
static PROXY_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/proxy/([^/]+)(?:/(.*))?$").expect("static proxy path pattern"));

/// Inbound request reduced to what the gateway forwards
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub target: String,
    /// Path tail after the target, without its leading `/`, undecoded
    pub rest: String,
    /// Raw query string, without `?`
    pub query: Option<String>,
    pub headers: HeaderMap,
    /// Only set for methods that carry a body upstream
    pub body: Option<Bytes>,
}

/// Fully resolved upstream call
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl ProxyRequest {
    /// Re-derive `target` and `rest` from the raw path (mount prefix already stripped).
    /// Returns `None` when the path is not a proxy path.
    pub fn from_parts(method: &Method, uri: &Uri, headers: &HeaderMap) -> Option<Self> {
        let (target, rest) = parse_proxy_path(uri.path())?;
        Some(Self {
            method: method.clone(),
            target: target.to_string(),
            rest: rest.to_string(),
            query: uri.query().map(str::to_string),
            headers: headers.clone(),
            body: None,
        })
    }
}

/// Split `/proxy/{target}/{rest}` into `(target, rest)`.
pub fn parse_proxy_path(path: &str) -> Option<(&str, &str)> {
    let captures = PROXY_PATH.captures(path)?;
    let target = captures.get(1)?.as_str();
    let rest = captures.get(2).map_or("", |m| m.as_str());
    Some((target, rest))
}

/// GET and HEAD never send a body upstream
pub fn carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}

/// Look up the base origin for `target`.
pub fn resolve_target<'a>(
    allowlist: &'a TargetAllowlist,
    target: &str,
) -> Result<&'a str, ProxyError> {
    allowlist
        .resolve(target)
        .ok_or_else(|| ProxyError::InvalidTarget(target.to_string()))
}

/// `base_url + "/" + rest`, plus `?query` when the query is non-empty.
pub fn build_outbound_url(base_url: &str, rest: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{}/{}?{}", base_url, rest, q),
        _ => format!("{}/{}", base_url, rest),
    }
}

/// Build the upstream call for `request` against an allowlisted `base_url`.
pub fn build_outbound_request(
    request: &ProxyRequest,
    base_url: &str,
    identity: &GatewayIdentity,
) -> OutboundRequest {
    let body = if carries_body(&request.method) {
        Some(request.body.clone().unwrap_or_default())
    } else {
        None
    };

    OutboundRequest {
        method: request.method.clone(),
        url: build_outbound_url(base_url, &request.rest, request.query.as_deref()),
        headers: build_outbound_headers(&request.headers, identity),
        body,
    }
}
