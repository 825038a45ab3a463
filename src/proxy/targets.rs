// Target allowlist
// The only place an outbound scheme and host can come from

use std::collections::HashMap;

use crate::error::{AppError, AppResult};

/// Upstream origins reachable through `/proxy/{target}`.
/// Changing this list requires a rebuild.
pub const BUILTIN_TARGETS: &[(&str, &str)] = &[
    ("gateway", "https://interface.gateway.uniswap.org"),
    ("graphql", "https://beta.gateway.uniswap.org"),
    ("trading-api", "https://trading-api-labs.interface.gateway.uniswap.org"),
    ("entry-gateway", "https://entry-gateway.backend-prod.api.uniswap.org"),
];

/// Immutable map from target identifier to upstream base origin.
#[derive(Debug, Clone)]
pub struct TargetAllowlist {
    targets: HashMap<String, String>,
}

impl TargetAllowlist {
    /// Allowlist compiled into the binary, validated.
    pub fn builtin() -> AppResult<Self> {
        Self::from_entries(BUILTIN_TARGETS.iter().copied())
    }

    /// Build an allowlist, rejecting any base URL that is not a bare http(s) origin.
    pub fn from_entries<I, K, V>(entries: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut targets = HashMap::new();
        for (target, base) in entries {
            let target = target.into();
            let base = base.into();
            validate_base_url(&target, &base)?;
            if targets.insert(target.clone(), base).is_some() {
                return Err(AppError::Allowlist {
                    target,
                    reason: "duplicate target".into(),
                });
            }
        }
        Ok(Self { targets })
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, target: &str) -> Option<&str> {
        self.targets.get(target).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

fn validate_base_url(target: &str, base: &str) -> AppResult<()> {
    let invalid = |reason: String| AppError::Allowlist {
        target: target.to_string(),
        reason,
    };

    if target.is_empty() || target.contains('/') {
        return Err(invalid("target must be a single non-empty path segment".into()));
    }

    let url = url::Url::parse(base).map_err(|e| invalid(format!("`{}`: {}", base, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("`{}`: scheme must be http or https", base)));
    }
    if url.host_str().is_none() {
        return Err(invalid(format!("`{}`: missing host", base)));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid(format!("`{}`: credentials are not allowed", base)));
    }
    // Url normalizes an empty path to "/", so check the raw string for the trailing slash
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() || base.ends_with('/')
    {
        return Err(invalid(format!(
            "`{}`: must be scheme + host only, without trailing slash",
            base
        )));
    }

    Ok(())
}
