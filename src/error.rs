//! Error types for the Schwab API client.
//!
//! This module provides a single error type covering all failure modes:
//! OAuth flow failures, token lifecycle problems, API error responses,
//! and transport-level errors.

use serde_json::Value;
use thiserror::Error;

/// A specialized `Result` type for Schwab API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for all Schwab API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport failure (connection error, timeout). No server-side
    /// processing is implied; these are generally safe to retry.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O failure (token file persistence)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// API returned a non-success response
    #[error("API error: status={status}, message={message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Human-readable error message extracted from the response
        message: String,
        /// Raw response body, verbatim, for diagnosis
        body: Value,
    },

    /// Authentication failed: token exchange or refresh rejected, no
    /// credentials available, or the API rejected a request even after a
    /// forced refresh.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The refresh token itself has expired. Terminal: the authorization
    /// flow must be re-run in a browser to obtain a new token pair.
    #[error("refresh token expired; re-authorization required")]
    RefreshTokenExpired,

    /// The OAuth redirect callback URL was malformed or carried no
    /// authorization code. The browser step must be redone.
    #[error("invalid callback URL: {0}")]
    InvalidCallback(String),

    /// Rate limited by the API. Surfaced immediately; backoff policy is
    /// the caller's responsibility.
    #[error("rate limited; retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Number of seconds to wait before retrying
        retry_after_secs: u64,
    },

    /// Resource not found (404)
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input provided to a function
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Returns `true` if this error is potentially transient and the
    /// operation could be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is an authentication-related error.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Error::Authentication(_) | Error::RefreshTokenExpired | Error::InvalidCallback(_)
        )
    }

    pub(crate) fn not_authenticated() -> Self {
        Error::Authentication(
            "not authenticated; complete the authorization flow first".to_string(),
        )
    }

    /// Create an error from a non-success API response.
    pub(crate) fn from_response(status: u16, body: Value) -> Self {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| body.get("error").and_then(Value::as_str))
            .or_else(|| body.get("error_description").and_then(Value::as_str))
            .unwrap_or("unknown API error")
            .to_string();

        if status == 404 {
            return Error::NotFound(message);
        }

        Error::Api {
            status,
            message,
            body,
        }
    }
}
