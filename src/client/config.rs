//! Client configuration options.

use std::path::PathBuf;
use std::time::Duration;

/// Default base URL for REST API requests.
pub const DEFAULT_BASE_URL: &str = "https://api.schwabapi.com";

/// Default token file, a dotfile in the working directory.
pub const DEFAULT_TOKEN_PATH: &str = ".schwab_tokens.json";

/// Configuration for the Schwab client.
///
/// # Example
///
/// ```
/// use schwab_rs::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_token_path("/home/trader/.schwab_tokens.json");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout applied to every HTTP call, including token
    /// exchanges
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
    /// Base URL for API requests
    pub base_url: String,
    /// Base URL for the OAuth authorize/token endpoints
    pub auth_base_url: String,
    /// Where the token pair is persisted
    pub token_path: PathBuf,
    /// Seconds before access-token expiry at which a refresh is triggered
    pub refresh_margin_secs: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("schwab-rs/{} (Rust)", env!("CARGO_PKG_VERSION")),
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_base_url: DEFAULT_BASE_URL.to_string(),
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            refresh_margin_secs: 60,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the base URL for API requests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the base URL for the OAuth endpoints.
    pub fn with_auth_base_url(mut self, auth_base_url: impl Into<String>) -> Self {
        self.auth_base_url = auth_base_url.into();
        self
    }

    /// Set the token file location.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Set the refresh safety margin in seconds.
    pub fn with_refresh_margin(mut self, secs: i64) -> Self {
        self.refresh_margin_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.token_path, PathBuf::from(DEFAULT_TOKEN_PATH));
        assert_eq!(config.refresh_margin_secs, 60);
    }

    #[test]
    fn test_builder_methods() {
        let config = ClientConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_base_url("http://127.0.0.1:8080")
            .with_refresh_margin(120);

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.refresh_margin_secs, 120);
    }
}
