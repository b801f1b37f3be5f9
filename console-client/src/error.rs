//! Client error types

use thiserror::Error;

/// Client error type
///
/// Every variant carries owned strings so an error can be cloned into the
/// collection store as a last-known failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Transport or connectivity failure (includes request timeouts)
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered outside 2xx
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body was not well-formed
    #[error("Decode error: {0}")]
    Decode(String),

    /// Session gate holds no token
    #[error("Not authorized")]
    NotAuthorized,

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// HTTP status of the failure, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server rejected the credential (401/403)
    ///
    /// Surfaced as-is; the client never revokes the session on its own.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// Server reported the target as missing
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Network(format!("request timed out: {err}"))
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
