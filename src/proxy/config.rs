use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// 反代服务配置
///
/// Runtime knobs only. The set of reachable upstreams is compiled in
/// (see `proxy::targets`) and is deliberately absent from this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// 是否允许局域网访问
    /// - false: 仅本机访问 127.0.0.1（默认）
    /// - true: 允许局域网访问 0.0.0.0
    pub allow_lan_access: bool,

    /// 监听端口
    pub port: u16,

    /// Path prefix the gateway routes are nested under, e.g. `/api`.
    /// Empty mounts `/proxy/...` at the root.
    pub mount_prefix: String,

    /// Public origin of the gateway. Sent upstream as `Origin` and `Referer`
    /// in place of whatever the caller sent.
    pub public_origin: String,

    /// Outbound request timeout (seconds)
    pub request_timeout: u64,

    /// Outbound connect timeout (seconds)
    pub connect_timeout: u64,

    /// Largest inbound request body buffered for forwarding (bytes)
    pub max_body_bytes: usize,

    /// 上游代理配置
    pub upstream_proxy: UpstreamProxyConfig,
}

/// 上游代理配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpstreamProxyConfig {
    /// 是否启用
    pub enabled: bool,
    /// 代理地址 (http://, https://, socks5://)
    pub url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allow_lan_access: false,
            port: 8045,
            mount_prefix: "/api".to_string(),
            public_origin: "https://app.uniswap.org".to_string(),
            request_timeout: default_request_timeout(),
            connect_timeout: 10,
            max_body_bytes: 10 * 1024 * 1024,
            upstream_proxy: UpstreamProxyConfig::default(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

impl ProxyConfig {
    /// 获取实际的监听地址
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        let origin = url::Url::parse(&self.public_origin).map_err(|e| {
            AppError::Config(format!(
                "public_origin `{}` is not a URL: {}",
                self.public_origin, e
            ))
        })?;
        if !matches!(origin.scheme(), "http" | "https") || origin.host_str().is_none() {
            return Err(AppError::Config(format!(
                "public_origin `{}` must be an http(s) origin",
                self.public_origin
            )));
        }

        if !self.mount_prefix.is_empty()
            && (!self.mount_prefix.starts_with('/') || self.mount_prefix.ends_with('/'))
        {
            return Err(AppError::Config(format!(
                "mount_prefix `{}` must start with `/` and have no trailing `/`",
                self.mount_prefix
            )));
        }

        if self.request_timeout == 0 || self.connect_timeout == 0 {
            return Err(AppError::Config("timeouts must be greater than zero".into()));
        }

        if self.upstream_proxy.enabled && self.upstream_proxy.url.is_empty() {
            return Err(AppError::Config(
                "upstream_proxy is enabled but has no url".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProxyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.get_bind_address(), "127.0.0.1");
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: ProxyConfig =
            serde_json::from_str(r#"{"port": 9000, "allow_lan_access": true}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.get_bind_address(), "0.0.0.0");
        assert_eq!(config.mount_prefix, "/api");
        assert_eq!(config.request_timeout, 30);
    }

    #[test]
    fn test_rejects_bad_mount_prefix() {
        let mut config = ProxyConfig::default();
        config.mount_prefix = "api".into();
        assert!(config.validate().is_err());

        config.mount_prefix = "/api/".into();
        assert!(config.validate().is_err());

        config.mount_prefix = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_public_origin() {
        let mut config = ProxyConfig::default();
        config.public_origin = "not a url".into();
        assert!(config.validate().is_err());

        config.public_origin = "ftp://example.org".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = ProxyConfig::default();
        config.request_timeout = 0;
        assert!(config.validate().is_err());
    }
}
