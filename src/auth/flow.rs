//! Authorization-code acquisition and the initial token exchange.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::auth::token::{TokenPair, TokenResponse};
use crate::auth::Credentials;
use crate::{Error, Result};

pub(crate) const AUTHORIZE_PATH: &str = "/v1/oauth/authorize";
pub(crate) const TOKEN_PATH: &str = "/v1/oauth/token";

/// The interactive half of OAuth: authorization URL construction, redirect
/// callback parsing, and the one-time exchange of an authorization code
/// for the initial token pair.
///
/// This is only used during setup (and again whenever the refresh token
/// expires). Day-to-day token refresh lives in
/// [`TokenManager`](crate::auth::TokenManager).
pub struct OAuthFlow {
    credentials: Arc<Credentials>,
    http: reqwest::Client,
    auth_base_url: String,
}

impl OAuthFlow {
    pub(crate) fn new(
        credentials: Arc<Credentials>,
        http: reqwest::Client,
        auth_base_url: String,
    ) -> Self {
        Self {
            credentials,
            http,
            auth_base_url,
        }
    }

    /// Build the authorization URL for the user to visit in a browser.
    ///
    /// `client_id` and `redirect_uri` are query-encoded exactly once. No
    /// side effects; the same inputs always produce the same URL.
    pub fn authorization_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}{}",
            self.auth_base_url.trim_end_matches('/'),
            AUTHORIZE_PATH
        ))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("redirect_uri", &self.credentials.redirect_uri);
        Ok(url)
    }

    /// Extract the authorization code from the redirect callback URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCallback`] if the URL is malformed or the
    /// `code` parameter is absent.
    pub fn parse_callback(callback_url: &str) -> Result<String> {
        let parsed = Url::parse(callback_url)
            .map_err(|e| Error::InvalidCallback(format!("{callback_url}: {e}")))?;

        let code = parsed
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| {
                Error::InvalidCallback("authorization code not found in callback URL".to_string())
            })?;

        if code.is_empty() {
            return Err(Error::InvalidCallback(
                "authorization code parameter is empty".to_string(),
            ));
        }

        Ok(code)
    }

    /// Exchange an authorization code for the initial token pair.
    ///
    /// The returned pair should be handed to
    /// [`TokenManager::install`](crate::auth::TokenManager::install),
    /// which also persists it.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenPair> {
        // Codes pasted straight out of the address bar may still carry a
        // percent-encoded '@'.
        let code = code.replace("%40", "@");

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(self.token_url())
            .basic_auth(
                &self.credentials.client_id,
                Some(self.credentials.client_secret()),
            )
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body: Value = response.json().await.unwrap_or_default();
            return Err(classify_exchange_error(code, body));
        }

        let payload: TokenResponse = response.json().await?;
        tracing::info!("authorization code exchanged for token pair");
        TokenPair::from_initial_exchange(payload)
    }

    pub(crate) fn token_url(&self) -> String {
        format!(
            "{}{}",
            self.auth_base_url.trim_end_matches('/'),
            TOKEN_PATH
        )
    }
}

/// Pull the standard OAuth `error` code out of a token-endpoint error body.
pub(crate) fn oauth_error_code(body: &Value) -> Option<&str> {
    body.get("error").and_then(Value::as_str)
}

fn classify_exchange_error(status: u16, body: Value) -> Error {
    match oauth_error_code(&body) {
        Some("invalid_grant") => Error::Authentication(
            "authorization code rejected (invalid or expired); redo the browser authorization"
                .to_string(),
        ),
        Some("invalid_client") | Some("unauthorized_client") => Error::Authentication(
            "client credentials rejected by the token endpoint".to_string(),
        ),
        _ => Error::Authentication(format!("token exchange failed ({status}): {body}")),
    }
}
