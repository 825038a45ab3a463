// Upstream client implementation
// One shared reqwest client; one attempt per inbound request, no retries.

use reqwest::{redirect, Client, Response};
use tokio::time::Duration;

use crate::error::{AppResult, ProxyError};
use crate::proxy::common::headers::GATEWAY_USER_AGENT;
use crate::proxy::config::ProxyConfig;
use crate::proxy::request::OutboundRequest;

const MAX_REDIRECTS: usize = 10;

pub struct UpstreamClient {
    http_client: Client,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> AppResult<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .user_agent(GATEWAY_USER_AGENT)
            .redirect(same_host_redirects());

        // Egress goes through a proxy only when configured, never via env vars
        let proxy = &config.upstream_proxy;
        if proxy.enabled && !proxy.url.is_empty() {
            builder = builder.proxy(reqwest::Proxy::all(&proxy.url)?);
            tracing::info!("UpstreamClient enabled proxy: {}", proxy.url);
        } else {
            builder = builder.no_proxy();
        }

        Ok(Self {
            http_client: builder.build()?,
        })
    }

    /// Issue `outbound` and return the response with its body still unread.
    /// reqwest fills in `accept: */*` when the caller sent no `Accept`.
    pub async fn send(&self, outbound: OutboundRequest) -> Result<Response, ProxyError> {
        let mut request = self
            .http_client
            .request(outbound.method, &outbound.url)
            .headers(outbound.headers);

        if let Some(body) = outbound.body {
            request = request.body(body);
        }

        request
            .send()
            .await
            .map_err(|e| ProxyError::UpstreamFailure(format!("HTTP request failed: {}", e)))
    }
}

/// Follow redirects only while they stay on the allowlisted host. A redirect
/// elsewhere fails the request, since `Location` never reaches the caller.
fn same_host_redirects() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        let original_host = attempt
            .previous()
            .first()
            .and_then(|url| url.host_str())
            .map(str::to_string);
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if attempt.url().host_str().map(str::to_string) == original_host {
            attempt.follow()
        } else {
            attempt.error("redirect leaves the allowlisted host")
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::common::headers::{build_outbound_headers, GatewayIdentity};
    use axum::http::{HeaderMap, Method};

    fn outbound(url: String) -> OutboundRequest {
        let identity = GatewayIdentity::new("https://app.example.org").unwrap();
        OutboundRequest {
            method: Method::GET,
            url,
            headers: build_outbound_headers(&HeaderMap::new(), &identity),
            body: None,
        }
    }

    #[test]
    fn test_client_builds_with_defaults() {
        assert!(UpstreamClient::new(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_client_rejects_bad_egress_proxy() {
        let mut config = ProxyConfig::default();
        config.upstream_proxy.enabled = true;
        config.upstream_proxy.url = "::not a proxy::".into();
        assert!(UpstreamClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_connection_refused_is_upstream_failure() {
        // Bind then drop to get a port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = UpstreamClient::new(&ProxyConfig::default()).unwrap();
        let result = client.send(outbound(format!("http://{}/", addr))).await;
        assert!(matches!(result, Err(ProxyError::UpstreamFailure(_))));
    }

    /// Upstream on 127.0.0.1 that redirects `/same` to itself and `/away` to `localhost`
    async fn spawn_redirecting_upstream() -> std::net::SocketAddr {
        use axum::{http::header, http::StatusCode, routing::get, Router};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let away = format!("http://localhost:{}/landed", addr.port());
        let app = Router::new()
            .route(
                "/same",
                get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/landed")]) }),
            )
            .route(
                "/away",
                get(move || {
                    let away = away.clone();
                    async move { (StatusCode::FOUND, [(header::LOCATION, away)]) }
                }),
            )
            .route("/landed", get(|| async { "landed" }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_same_host_redirect_is_followed() {
        let addr = spawn_redirecting_upstream().await;
        let client = UpstreamClient::new(&ProxyConfig::default()).unwrap();

        let response = client
            .send(outbound(format!("http://{}/same", addr)))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "landed");
    }

    #[tokio::test]
    async fn test_cross_host_redirect_is_upstream_failure() {
        let addr = spawn_redirecting_upstream().await;
        let client = UpstreamClient::new(&ProxyConfig::default()).unwrap();

        let result = client.send(outbound(format!("http://{}/away", addr))).await;
        assert!(matches!(result, Err(ProxyError::UpstreamFailure(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_upstream_failure() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let mut config = ProxyConfig::default();
        config.request_timeout = 1;
        let client = UpstreamClient::new(&config).unwrap();
        let result = client.send(outbound(format!("http://{}/slow", addr))).await;
        assert!(matches!(result, Err(ProxyError::UpstreamFailure(_))));
    }
}
