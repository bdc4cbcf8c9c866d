//! HTTP client implementation for the Schwab API.

use std::sync::Arc;

use chrono::Duration;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

use crate::api::{AccountsService, MarketDataService, OrdersService};
use crate::auth::{Credentials, OAuthFlow, TokenManager, TokenStore};
use crate::{Error, Result};

use super::config::ClientConfig;

/// The main client for interacting with the Schwab API.
///
/// The client owns the token lifecycle and provides access to the API
/// through service accessors. It is cheap to clone; clones share the
/// same session.
///
/// # Example
///
/// ```no_run
/// use schwab_rs::{Credentials, SchwabClient};
///
/// # async fn example() -> schwab_rs::Result<()> {
/// let client = SchwabClient::with_defaults(Credentials::new(
///     "app-key",
///     "app-secret",
///     "https://127.0.0.1",
/// ))?;
///
/// let quote = client.market_data().quote("AAPL").await?;
/// println!("AAPL last: {:?}", quote.last_price);
/// # Ok(())
/// # }
/// ```
pub struct SchwabClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) tokens: TokenManager,
    pub(crate) flow: OAuthFlow,
    pub(crate) config: ClientConfig,
}

impl SchwabClient {
    /// Create a new client with the given credentials and configuration.
    ///
    /// Any token pair persisted at the configured token path is loaded
    /// immediately; if none exists, the client starts unauthenticated and
    /// the authorization flow must be run once.
    pub fn new(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let credentials = Arc::new(credentials);
        let flow = OAuthFlow::new(
            credentials.clone(),
            http.clone(),
            config.auth_base_url.clone(),
        );
        let tokens = TokenManager::new(
            credentials,
            http.clone(),
            TokenStore::new(config.token_path.clone()),
            flow.token_url(),
            Duration::seconds(config.refresh_margin_secs),
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                tokens,
                flow,
                config,
            }),
        })
    }

    /// Create a new client with default configuration.
    pub fn with_defaults(credentials: Credentials) -> Result<Self> {
        Self::new(credentials, ClientConfig::default())
    }

    /// Build the authorization URL for the one-time browser step.
    pub fn authorization_url(&self) -> Result<Url> {
        self.inner.flow.authorization_url()
    }

    /// Complete authentication from the full redirect callback URL.
    ///
    /// Parses the authorization code out of the URL, exchanges it for a
    /// token pair, and installs + persists the pair.
    pub async fn authorize_from_callback(&self, callback_url: &str) -> Result<()> {
        let code = OAuthFlow::parse_callback(callback_url)?;
        self.authorize_with_code(&code).await
    }

    /// Complete authentication from a bare authorization code.
    pub async fn authorize_with_code(&self, code: &str) -> Result<()> {
        let pair = self.inner.flow.exchange_code(code).await?;
        self.inner.tokens.install(pair).await;
        Ok(())
    }

    /// Whether a token pair is currently held.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.tokens.is_authenticated().await
    }

    /// Force a refresh-token exchange regardless of local expiry.
    pub async fn force_refresh(&self) -> Result<()> {
        self.inner.tokens.force_refresh().await.map(|_| ())
    }

    /// Access the token manager directly.
    pub fn tokens(&self) -> &TokenManager {
        &self.inner.tokens
    }

    /// Get the market data service.
    pub fn market_data(&self) -> MarketDataService {
        MarketDataService::new(self.inner.clone())
    }

    /// Get the accounts service.
    pub fn accounts(&self) -> AccountsService {
        AccountsService::new(self.inner.clone())
    }

    /// Get the orders service.
    pub fn orders(&self) -> OrdersService {
        OrdersService::new(self.inner.clone())
    }
}

impl Clone for SchwabClient {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for SchwabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchwabClient")
            .field("config", &self.inner.config)
            .finish()
    }
}

impl ClientInner {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Execute an authenticated request.
    ///
    /// Attaches a currently valid bearer token and sends the call. A 401
    /// triggers exactly one forced refresh and one retry; a second 401
    /// surfaces as [`Error::Authentication`]. Rate limiting (429) is
    /// surfaced immediately as [`Error::RateLimited`] and never retried
    /// here. Successful responses are returned unwrapped.
    pub(crate) async fn execute<Q, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<reqwest::Response>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let token = self.tokens.get_valid_access_token().await?;
        let response = self.send(method.clone(), path, query, body, &token).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return self.check(response).await;
        }

        tracing::debug!(%path, "request unauthorized; forcing token refresh and retrying once");
        let token = self.tokens.force_refresh().await?;
        let retry = self.send(method, path, query, body, &token).await?;

        if retry.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication(
                "request rejected by the API after a forced token refresh".to_string(),
            ));
        }
        self.check(retry).await
    }

    async fn send<Q, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
        token: &SecretString,
    ) -> Result<reqwest::Response>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let mut request = self
            .http
            .request(method, self.url(path))
            .bearer_auth(token.expose_secret());
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Map non-success statuses into the error taxonomy.
    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(Error::RateLimited { retry_after_secs });
        }

        let code = status.as_u16();
        let body: Value = response.json().await.unwrap_or_default();
        Err(Error::from_response(code, body))
    }

    /// Make a GET request.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute::<(), ()>(Method::GET, path, None, None).await?;
        parse_json(response).await
    }

    /// Make a GET request with query parameters.
    pub(crate) async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self
            .execute::<Q, ()>(Method::GET, path, Some(query), None)
            .await?;
        parse_json(response).await
    }

    /// Make a POST request.
    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .execute::<(), B>(Method::POST, path, None, Some(body))
            .await?;
        parse_json(response).await
    }

    /// Make a POST request and return the `Location` response header,
    /// which is how order placement reports the new resource.
    pub(crate) async fn post_for_location<B>(&self, path: &str, body: &B) -> Result<Option<String>>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .execute::<(), B>(Method::POST, path, None, Some(body))
            .await?;
        Ok(response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    /// Make a PUT request, discarding any response body.
    pub(crate) async fn put_empty<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.execute::<(), B>(Method::PUT, path, None, Some(body))
            .await?;
        Ok(())
    }

    /// Make a DELETE request, discarding any response body.
    pub(crate) async fn delete_empty(&self, path: &str) -> Result<()> {
        self.execute::<(), ()>(Method::DELETE, path, None, None)
            .await?;
        Ok(())
    }
}

/// Parse a response body, tolerating empty bodies (204 and friends).
async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
