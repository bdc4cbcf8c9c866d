//! Token pair state and the refresh lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::auth::flow::oauth_error_code;
use crate::auth::store::{PersistedSession, TokenStore};
use crate::auth::Credentials;
use crate::{Error, Result};

/// Access token validity window granted by the provider, in seconds.
pub const ACCESS_TOKEN_LIFETIME_SECS: i64 = 1800;

/// Refresh token validity window, in seconds (7 days).
pub const REFRESH_TOKEN_LIFETIME_SECS: i64 = 604_800;

/// An access/refresh token pair with expiry bookkeeping.
///
/// Pairs are immutable; a refresh produces a whole new pair. When a
/// refresh response omits a new refresh token, the previous refresh token
/// and its original expiry carry over unchanged.
#[derive(Clone)]
pub struct TokenPair {
    pub(crate) access_token: SecretString,
    pub(crate) refresh_token: SecretString,
    pub(crate) access_expires_at: DateTime<Utc>,
    pub(crate) refresh_expires_at: DateTime<Utc>,
}

impl TokenPair {
    /// Invariant: the access token never outlives the refresh token.
    fn new(
        access_token: SecretString,
        refresh_token: SecretString,
        access_expires_at: DateTime<Utc>,
        refresh_expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            access_expires_at: access_expires_at.min(refresh_expires_at),
            refresh_expires_at,
        }
    }

    pub(crate) fn from_initial_exchange(response: TokenResponse) -> Result<Self> {
        let refresh_token = response.refresh_token.ok_or_else(|| {
            Error::Authentication("token endpoint returned no refresh token".to_string())
        })?;
        let now = Utc::now();
        Ok(Self::new(
            SecretString::from(response.access_token),
            SecretString::from(refresh_token),
            now + Duration::seconds(response.expires_in),
            now + Duration::seconds(REFRESH_TOKEN_LIFETIME_SECS),
        ))
    }

    pub(crate) fn from_refresh(response: TokenResponse, previous: &TokenPair) -> Self {
        let now = Utc::now();
        let access_token = SecretString::from(response.access_token);
        let access_expires_at = now + Duration::seconds(response.expires_in);

        match response.refresh_token {
            // The provider rotated the refresh token; its window restarts.
            Some(rotated) => Self::new(
                access_token,
                SecretString::from(rotated),
                access_expires_at,
                now + Duration::seconds(REFRESH_TOKEN_LIFETIME_SECS),
            ),
            // No rotation: keep the old refresh token and its expiry.
            None => Self::new(
                access_token,
                previous.refresh_token.clone(),
                access_expires_at,
                previous.refresh_expires_at,
            ),
        }
    }

    pub(crate) fn from_persisted(session: PersistedSession) -> Self {
        Self::new(
            SecretString::from(session.access_token),
            SecretString::from(session.refresh_token),
            session.access_expires_at,
            session.refresh_expires_at,
        )
    }

    fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            access_token: self.access_token.expose_secret().to_string(),
            refresh_token: self.refresh_token.expose_secret().to_string(),
            access_expires_at: self.access_expires_at,
            refresh_expires_at: self.refresh_expires_at,
            written_at: Utc::now(),
        }
    }

    /// Does the access token expire within `margin` from now?
    pub(crate) fn access_expires_within(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.access_expires_at
    }

    /// Has the refresh token itself expired?
    pub(crate) fn refresh_expired(&self) -> bool {
        Utc::now() >= self.refresh_expires_at
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish()
    }
}

/// Wire format of the token endpoint's success response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    #[allow(dead_code)]
    pub token_type: Option<String>,
}

fn default_expires_in() -> i64 {
    ACCESS_TOKEN_LIFETIME_SECS
}

/// How a refresh request decides whether the work is still needed once it
/// holds the write lock.
enum RefreshGate {
    /// Skip if the access token is no longer within the refresh margin
    /// (another caller refreshed while we waited).
    IfStillExpiring,
    /// Skip if any refresh completed since the caller observed this
    /// generation.
    UnlessReplacedSince(u64),
}

struct TokenState {
    pair: Option<TokenPair>,
    generation: u64,
}

/// Owns the token pair and keeps it valid.
///
/// The manager loads any persisted session at construction, hands out the
/// access token for as long as it is comfortably inside its validity
/// window, and performs a refresh exchange when it is not. Every
/// successful exchange is written back through the [`TokenStore`].
///
/// # Thread safety
///
/// The manager is shared by handle across tasks. The whole
/// check-refresh-replace sequence runs under one write lock, so
/// concurrent callers observe at most one in-flight refresh exchange;
/// anyone arriving while a refresh is underway waits for it and reuses
/// its result.
pub struct TokenManager {
    inner: Arc<RwLock<TokenState>>,
    credentials: Arc<Credentials>,
    http: reqwest::Client,
    store: TokenStore,
    token_url: String,
    refresh_margin: Duration,
}

impl TokenManager {
    pub(crate) fn new(
        credentials: Arc<Credentials>,
        http: reqwest::Client,
        store: TokenStore,
        token_url: String,
        refresh_margin: Duration,
    ) -> Self {
        let pair = store.load().map(TokenPair::from_persisted);
        if pair.is_some() {
            tracing::info!(path = %store.path().display(), "loaded persisted tokens");
        }
        Self {
            inner: Arc::new(RwLock::new(TokenState {
                pair,
                generation: 0,
            })),
            credentials,
            http,
            store,
            token_url,
            refresh_margin,
        }
    }

    /// Get an access token that is currently valid, refreshing first if
    /// the held token is within the safety margin of expiry.
    ///
    /// # Errors
    ///
    /// - [`Error::Authentication`] if no token pair is held (never
    ///   authenticated, or the token file was missing/corrupt).
    /// - [`Error::RefreshTokenExpired`] if a refresh is needed but the
    ///   refresh token has expired; no network call is made in that case.
    pub async fn get_valid_access_token(&self) -> Result<SecretString> {
        {
            let state = self.inner.read().await;
            match &state.pair {
                Some(pair) if !pair.access_expires_within(self.refresh_margin) => {
                    return Ok(pair.access_token.clone());
                }
                Some(_) => {}
                None => return Err(Error::not_authenticated()),
            }
        }
        self.refresh(RefreshGate::IfStillExpiring).await
    }

    /// Refresh regardless of the local expiry check.
    ///
    /// Used by the request layer after the API rejects a token the local
    /// clock still considered valid (skew, server-side invalidation). If
    /// another refresh completes between the caller observing the stale
    /// token and this call acquiring the lock, that result is reused
    /// instead of issuing a second exchange.
    pub async fn force_refresh(&self) -> Result<SecretString> {
        let observed = self.inner.read().await.generation;
        self.refresh(RefreshGate::UnlessReplacedSince(observed)).await
    }

    /// Install a token pair produced by the authorization flow and
    /// persist it.
    pub async fn install(&self, pair: TokenPair) {
        let mut state = self.inner.write().await;
        self.persist(&pair);
        state.pair = Some(pair);
        state.generation += 1;
    }

    /// Whether a token pair is currently held.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.pair.is_some()
    }

    /// When the held access token expires, if any pair is held.
    pub async fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.pair.as_ref().map(|p| p.access_expires_at)
    }

    async fn refresh(&self, gate: RefreshGate) -> Result<SecretString> {
        let mut state = self.inner.write().await;

        let refresh_token = {
            let pair = state.pair.as_ref().ok_or_else(Error::not_authenticated)?;
            let already_fresh = match gate {
                RefreshGate::IfStillExpiring => {
                    !pair.access_expires_within(self.refresh_margin)
                }
                RefreshGate::UnlessReplacedSince(observed) => state.generation != observed,
            };
            if already_fresh {
                return Ok(pair.access_token.clone());
            }
            if pair.refresh_expired() {
                return Err(Error::RefreshTokenExpired);
            }
            pair.refresh_token.clone()
        };

        // The write guard is held across the exchange on purpose: it is
        // the mutual-exclusion boundary that serializes refreshes.
        let response = self.request_refresh(&refresh_token).await?;

        let Some(previous) = state.pair.as_ref() else {
            return Err(Error::not_authenticated());
        };
        let new_pair = TokenPair::from_refresh(response, previous);
        self.persist(&new_pair);

        let token = new_pair.access_token.clone();
        state.pair = Some(new_pair);
        state.generation += 1;
        tracing::debug!("access token refreshed");
        Ok(token)
    }

    async fn request_refresh(&self, refresh_token: &SecretString) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(self.credentials.client_secret()),
            )
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let code = status.as_u16();
        let body: Value = response.json().await.unwrap_or_default();

        if status.is_client_error() {
            // The provider telling us the refresh token is no longer good
            // is the one terminal case; everything else may be transient.
            if oauth_error_code(&body) == Some("invalid_grant") {
                return Err(Error::RefreshTokenExpired);
            }
            return Err(Error::Authentication(format!(
                "token refresh rejected ({code}): {body}"
            )));
        }

        Err(Error::from_response(code, body))
    }

    fn persist(&self, pair: &TokenPair) {
        if let Err(e) = self.store.save(&pair.to_persisted()) {
            tracing::warn!(
                error = %e,
                "failed to persist tokens; continuing with in-memory pair"
            );
        }
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url)
            .field("refresh_margin", &self.refresh_margin)
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pair(access_secs: i64, refresh_secs: i64) -> TokenPair {
        let now = Utc::now();
        TokenPair::new(
            SecretString::from("access".to_string()),
            SecretString::from("refresh".to_string()),
            now + Duration::seconds(access_secs),
            now + Duration::seconds(refresh_secs),
        )
    }

    #[test]
    fn test_expiry_margin_math() {
        assert!(!pair(3600, 604_800).access_expires_within(Duration::seconds(60)));
        assert!(pair(30, 604_800).access_expires_within(Duration::seconds(60)));
        assert!(pair(-10, 604_800).access_expires_within(Duration::seconds(60)));

        assert!(!pair(30, 3600).refresh_expired());
        assert!(pair(-100, -10).refresh_expired());
    }

    #[test]
    fn test_access_expiry_clamped_to_refresh_expiry() {
        // A late-life refresh: the refresh token dies in 10 minutes, so a
        // 30-minute access window must be clamped down to it.
        let p = pair(1800, 600);
        assert_eq!(p.access_expires_at, p.refresh_expires_at);
    }

    #[test]
    fn test_refresh_retains_old_refresh_token_when_omitted() {
        let previous = pair(10, 3600);
        let response = TokenResponse {
            access_token: "new-access".to_string(),
            refresh_token: None,
            expires_in: 1800,
            token_type: Some("Bearer".to_string()),
        };

        let renewed = TokenPair::from_refresh(response, &previous);
        assert_eq!(renewed.access_token.expose_secret(), "new-access");
        assert_eq!(renewed.refresh_token.expose_secret(), "refresh");
        // Retained refresh token keeps its original expiry.
        assert_eq!(renewed.refresh_expires_at, previous.refresh_expires_at);
    }

    #[test]
    fn test_refresh_rotation_restarts_refresh_window() {
        let previous = pair(10, 3600);
        let response = TokenResponse {
            access_token: "new-access".to_string(),
            refresh_token: Some("new-refresh".to_string()),
            expires_in: 1800,
            token_type: None,
        };

        let renewed = TokenPair::from_refresh(response, &previous);
        assert_eq!(renewed.refresh_token.expose_secret(), "new-refresh");
        assert!(renewed.refresh_expires_at > previous.refresh_expires_at);
    }

    #[test]
    fn test_persisted_round_trip() {
        let original = pair(1800, 604_800);
        let restored = TokenPair::from_persisted(original.to_persisted());

        assert_eq!(
            restored.access_token.expose_secret(),
            original.access_token.expose_secret()
        );
        assert_eq!(
            restored.refresh_token.expose_secret(),
            original.refresh_token.expose_secret()
        );
        assert_eq!(restored.access_expires_at, original.access_expires_at);
        assert_eq!(restored.refresh_expires_at, original.refresh_expires_at);
    }

    #[test]
    fn test_token_response_defaults_expires_in() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "abc"}"#).unwrap();
        assert_eq!(response.expires_in, ACCESS_TOKEN_LIFETIME_SECS);
        assert!(response.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_fresh_token_returned_without_network() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        let manager = TokenManager::new(
            Arc::new(Credentials::new("CID", "SECRET", "https://127.0.0.1")),
            reqwest::Client::new(),
            store,
            "http://127.0.0.1:9/v1/oauth/token".to_string(),
            Duration::seconds(60),
        );
        manager.inner.write().await.pair = Some(pair(3600, 604_800));

        // The token endpoint is unreachable, so success proves no call
        // was attempted.
        let token = manager.get_valid_access_token().await.unwrap();
        assert_eq!(token.expose_secret(), "access");
    }

    #[tokio::test]
    async fn test_expired_refresh_token_is_terminal_without_network() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        let manager = TokenManager::new(
            Arc::new(Credentials::new("CID", "SECRET", "https://127.0.0.1")),
            reqwest::Client::new(),
            store,
            "http://127.0.0.1:9/v1/oauth/token".to_string(),
            Duration::seconds(60),
        );
        manager.inner.write().await.pair = Some(pair(-100, -10));

        let err = manager.get_valid_access_token().await.unwrap_err();
        assert!(matches!(err, Error::RefreshTokenExpired));
    }

    #[tokio::test]
    async fn test_unauthenticated_manager_fails_fast() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("missing.json"));
        let manager = TokenManager::new(
            Arc::new(Credentials::new("CID", "SECRET", "https://127.0.0.1")),
            reqwest::Client::new(),
            store,
            "http://127.0.0.1:9/v1/oauth/token".to_string(),
            Duration::seconds(60),
        );

        let err = manager.get_valid_access_token().await.unwrap_err();
        assert!(matches!(err, Error::Authentication(msg) if msg.contains("not authenticated")));
    }
}
