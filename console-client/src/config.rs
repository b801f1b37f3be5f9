//! Client configuration

use std::path::PathBuf;

/// Client configuration for connecting to the admin API
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | CONSOLE_BASE_URL | http://localhost:3000 | API base URL |
/// | CONSOLE_TIMEOUT_SECS | 30 | Per-request timeout |
/// | CONSOLE_TOKEN_PATH | (unset) | File holding the persisted session token |
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:3000")
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Durable token store location; `None` keeps the token in memory only
    pub token_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 30,
            token_path: None,
        }
    }

    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("CONSOLE_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: std::env::var("CONSOLE_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            token_path: std::env::var("CONSOLE_TOKEN_PATH").ok().map(PathBuf::from),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    /// Persist the session token at `path`
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    /// Base URL without a trailing slash
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}
