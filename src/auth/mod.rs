//! OAuth 2.0 authentication and token lifecycle management.
//!
//! Schwab uses the standard authorization-code grant: the user visits an
//! authorization URL in a browser, approves the application, and is
//! redirected to the configured callback URL carrying a one-time code.
//! Exchanging that code yields a short-lived access token (~30 minutes)
//! and a refresh token valid for 7 days.
//!
//! The pieces:
//!
//! - [`OAuthFlow`] builds the authorization URL, parses the redirect
//!   callback, and exchanges the code for the initial token pair.
//! - [`TokenManager`] owns the in-memory token state, refreshes the
//!   access token lazily before it expires, and persists every new pair.
//! - [`TokenStore`] is the durable JSON file behind the manager.
//!
//! Refresh is always triggered by the next call that needs a token; there
//! is no background timer. Once the refresh token itself expires the only
//! recovery is a fresh browser authorization.
//!
//! ```no_run
//! use schwab_rs::{Credentials, SchwabClient};
//!
//! # async fn example() -> schwab_rs::Result<()> {
//! let client = SchwabClient::with_defaults(Credentials::new(
//!     "app-key",
//!     "app-secret",
//!     "https://127.0.0.1",
//! ))?;
//!
//! // One-time interactive setup:
//! println!("visit: {}", client.authorization_url()?);
//! // ...user authorizes in the browser, pastes the redirect URL back...
//! client.authorize_from_callback("https://127.0.0.1/?code=...").await?;
//! # Ok(())
//! # }
//! ```

mod flow;
mod store;
mod token;

pub use flow::OAuthFlow;
pub use store::{PersistedSession, TokenStore};
pub use token::{
    TokenManager, TokenPair, ACCESS_TOKEN_LIFETIME_SECS, REFRESH_TOKEN_LIFETIME_SECS,
};

use secrecy::{ExposeSecret, SecretString};

/// OAuth application credentials, supplied at client construction.
///
/// These are never persisted; only the token pair they produce is written
/// to disk.
pub struct Credentials {
    /// OAuth client ID (the "App Key" from the developer portal)
    pub client_id: String,
    pub(crate) client_secret: SecretString,
    /// OAuth redirect URI; must match the application settings exactly
    pub redirect_uri: String,
}

impl Credentials {
    /// Create a new set of application credentials.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            redirect_uri: redirect_uri.into(),
        }
    }

    pub(crate) fn client_secret(&self) -> &str {
        self.client_secret.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}
