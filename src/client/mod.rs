//! HTTP client and service layer for the Schwab API.
//!
//! This module provides the main entry point [`SchwabClient`] along with
//! its configuration. The client owns the OAuth token lifecycle; every
//! request made through it carries a currently valid bearer token and is
//! retried exactly once (after a forced refresh) if the API rejects the
//! token.
//!
//! # Example
//!
//! ```no_run
//! use schwab_rs::{ClientConfig, Credentials, SchwabClient};
//!
//! # async fn example() -> schwab_rs::Result<()> {
//! let client = SchwabClient::new(
//!     Credentials::new("app-key", "app-secret", "https://127.0.0.1"),
//!     ClientConfig::default().with_token_path("/home/trader/.schwab_tokens.json"),
//! )?;
//!
//! let accounts = client.accounts().account_numbers().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod http;

pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TOKEN_PATH};
pub use http::SchwabClient;
pub(crate) use http::ClientInner;
