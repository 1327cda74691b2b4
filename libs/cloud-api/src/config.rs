//! Connection settings for the cloud-management API.

use std::time::Duration;

use crate::error::ApiError;

/// Default API root when none is configured.
pub const DEFAULT_API_ROOT: &str = "https://api.linode.com/v4";

/// Per-request timeout applied to every call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API root, without trailing slash.
    pub base_url: String,

    /// Bearer token for the account being operated on.
    pub token: String,

    pub timeout: Duration,

    /// Skip TLS certificate validation. Test environments only.
    pub accept_invalid_certs: bool,

    pub user_agent: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: true,
            user_agent: format!("fixturectl/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `FIXTURE_API_ROOT` (or the browser harness's `REACT_APP_API_ROOT`),
    /// `FIXTURE_TOKEN`, `FIXTURE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = std::env::var("FIXTURE_API_ROOT")
            .or_else(|_| std::env::var("REACT_APP_API_ROOT"))
            .unwrap_or_else(|_| DEFAULT_API_ROOT.to_string());

        let token = std::env::var("FIXTURE_TOKEN")
            .map_err(|_| ApiError::Config("FIXTURE_TOKEN is not set".to_string()))?;

        let mut config = Self::new(base_url, token);
        if let Some(secs) = std::env::var("FIXTURE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Same endpoint and transport settings, different account.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..self.clone()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = ApiConfig::new("https://api.example.test/v4/", "t");
        assert_eq!(config.base_url, "https://api.example.test/v4");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn with_token_keeps_transport_settings() {
        let config = ApiConfig::new("https://api.example.test", "a").with_timeout(Duration::from_secs(3));
        let other = config.with_token("b");
        assert_eq!(other.token, "b");
        assert_eq!(other.base_url, config.base_url);
        assert_eq!(other.timeout, Duration::from_secs(3));
    }
}
