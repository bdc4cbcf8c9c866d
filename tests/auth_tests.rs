//! Integration tests for the OAuth token lifecycle and the authenticated
//! request layer, run against a local mock HTTP server.
//!
//! Run with: cargo test --test auth_tests

use std::path::PathBuf;
use std::sync::Once;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use mockito::{Matcher, Mock, ServerGuard};
use secrecy::ExposeSecret;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use schwab_rs::auth::PersistedSession;
use schwab_rs::models::{AccountHash, Instruction, OrderId, OrderSpec, OrderType};
use schwab_rs::{ClientConfig, Credentials, Error, SchwabClient};

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn credentials() -> Credentials {
    Credentials::new("test-client-id", "test-client-secret", "https://127.0.0.1")
}

fn config_for(base_url: &str, token_path: PathBuf) -> ClientConfig {
    ClientConfig::default()
        .with_base_url(base_url)
        .with_auth_base_url(base_url)
        .with_token_path(token_path)
        .with_timeout(StdDuration::from_secs(5))
}

/// Write a token file whose access token expires `access_secs` from now
/// and whose refresh token expires `refresh_secs` from now.
fn seed_tokens(dir: &TempDir, access_secs: i64, refresh_secs: i64) -> PathBuf {
    let path = dir.path().join("tokens.json");
    let now = Utc::now();
    let session = PersistedSession {
        access_token: "seed-access".to_string(),
        refresh_token: "seed-refresh".to_string(),
        access_expires_at: now + Duration::seconds(access_secs),
        refresh_expires_at: now + Duration::seconds(refresh_secs),
        written_at: now,
    };
    std::fs::write(&path, serde_json::to_vec_pretty(&session).unwrap()).unwrap();
    path
}

/// Mock the token endpoint to mint `fresh-access` on a refresh grant.
async fn mock_refresh(server: &mut ServerGuard, hits: usize) -> Mock {
    server
        .mock("POST", "/v1/oauth/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "seed-refresh".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"access_token": "fresh-access", "token_type": "Bearer", "expires_in": 1800}"#,
        )
        .expect(hits)
        .create_async()
        .await
}

#[tokio::test]
async fn fresh_token_is_served_without_any_network_call() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let token_path = seed_tokens(&dir, 3600, 604_800);

    // Nothing listens at this address; success proves no call was made.
    let client =
        SchwabClient::new(credentials(), config_for("http://127.0.0.1:1", token_path)).unwrap();

    let token = client.tokens().get_valid_access_token().await.unwrap();
    assert_eq!(token.expose_secret(), "seed-access");
}

#[tokio::test]
async fn expiring_token_triggers_exactly_one_refresh() {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let refresh = mock_refresh(&mut server, 1).await;

    let dir = TempDir::new().unwrap();
    // 30s left: inside the 60s refresh margin.
    let token_path = seed_tokens(&dir, 30, 604_800);
    let client =
        SchwabClient::new(credentials(), config_for(&server.url(), token_path)).unwrap();

    let token = client.tokens().get_valid_access_token().await.unwrap();
    assert_eq!(token.expose_secret(), "fresh-access");

    // The renewed token is comfortably fresh; no second exchange.
    let token = client.tokens().get_valid_access_token().await.unwrap();
    assert_eq!(token.expose_secret(), "fresh-access");

    refresh.assert_async().await;
}

#[tokio::test]
async fn refresh_persists_renewed_pair_and_retains_old_refresh_token() {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let refresh = mock_refresh(&mut server, 1).await;

    let dir = TempDir::new().unwrap();
    let token_path = seed_tokens(&dir, 30, 604_800);
    let client = SchwabClient::new(
        credentials(),
        config_for(&server.url(), token_path.clone()),
    )
    .unwrap();

    client.tokens().get_valid_access_token().await.unwrap();
    refresh.assert_async().await;

    // The response carried no refresh_token, so the old one is retained
    // and the rewritten file reflects both.
    let persisted: PersistedSession =
        serde_json::from_slice(&std::fs::read(&token_path).unwrap()).unwrap();
    assert_eq!(persisted.access_token, "fresh-access");
    assert_eq!(persisted.refresh_token, "seed-refresh");
}

#[tokio::test]
async fn concurrent_callers_share_a_single_refresh() {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let refresh = mock_refresh(&mut server, 1).await;

    let dir = TempDir::new().unwrap();
    let token_path = seed_tokens(&dir, 30, 604_800);
    let client =
        SchwabClient::new(credentials(), config_for(&server.url(), token_path)).unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client
                .tokens()
                .get_valid_access_token()
                .await
                .map(|t| t.expose_secret().to_string())
        }));
    }

    for handle in handles {
        let token = handle.await.unwrap().unwrap();
        assert_eq!(token, "fresh-access");
    }

    refresh.assert_async().await;
}

#[tokio::test]
async fn expired_refresh_token_is_terminal_and_offline() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let token_path = seed_tokens(&dir, -100, -10);

    // Unreachable endpoint: the terminal error must come from the local
    // expiry check, not a network exchange.
    let client =
        SchwabClient::new(credentials(), config_for("http://127.0.0.1:1", token_path)).unwrap();

    let err = client.tokens().get_valid_access_token().await.unwrap_err();
    assert!(matches!(err, Error::RefreshTokenExpired));
}

#[tokio::test]
async fn missing_token_file_reports_not_authenticated() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let token_path = dir.path().join("never-written.json");

    let client =
        SchwabClient::new(credentials(), config_for("http://127.0.0.1:1", token_path)).unwrap();

    assert!(!client.is_authenticated().await);
    let err = client.market_data().quote("AAPL").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(msg) if msg.contains("not authenticated")));
}

#[tokio::test]
async fn corrupt_token_file_reports_not_authenticated() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let token_path = dir.path().join("tokens.json");
    std::fs::write(&token_path, b"{\"access_token\": \"trunc").unwrap();

    let client =
        SchwabClient::new(credentials(), config_for("http://127.0.0.1:1", token_path)).unwrap();

    let err = client.tokens().get_valid_access_token().await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));
}

#[tokio::test]
async fn unauthorized_response_triggers_single_refresh_and_retry() {
    init_logging();
    let mut server = mockito::Server::new_async().await;

    // First attempt carries the seeded token and is rejected.
    let rejected = server
        .mock("GET", "/marketdata/v1/quotes/AAPL")
        .match_header("authorization", "Bearer seed-access")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "token invalid"}"#)
        .expect(1)
        .create_async()
        .await;

    let refresh = mock_refresh(&mut server, 1).await;

    // The retry carries the renewed token and succeeds.
    let accepted = server
        .mock("GET", "/marketdata/v1/quotes/AAPL")
        .match_header("authorization", "Bearer fresh-access")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"AAPL": {"assetMainType": "EQUITY", "quote": {"bidPrice": 172.5, "askPrice": 172.62, "lastPrice": 172.55}}}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    // Locally fresh: the 401 comes as a surprise (server-side invalidation).
    let token_path = seed_tokens(&dir, 3600, 604_800);
    let client =
        SchwabClient::new(credentials(), config_for(&server.url(), token_path)).unwrap();

    // The caller observes only the successful final result.
    let quote = client.market_data().quote("AAPL").await.unwrap();
    assert_eq!(quote.symbol, "AAPL");
    assert_eq!(quote.last_price, Some(rust_decimal_macros::dec!(172.55)));

    // Exactly 2 API calls and 1 refresh exchange occurred.
    rejected.assert_async().await;
    refresh.assert_async().await;
    accepted.assert_async().await;
}

#[tokio::test]
async fn unauthorized_twice_surfaces_authentication_error_without_third_attempt() {
    init_logging();
    let mut server = mockito::Server::new_async().await;

    let rejected = server
        .mock("GET", "/marketdata/v1/quotes/AAPL")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "token invalid"}"#)
        .expect(2)
        .create_async()
        .await;

    let refresh = mock_refresh(&mut server, 1).await;

    let dir = TempDir::new().unwrap();
    let token_path = seed_tokens(&dir, 3600, 604_800);
    let client =
        SchwabClient::new(credentials(), config_for(&server.url(), token_path)).unwrap();

    let err = client.market_data().quote("AAPL").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));

    // Original + one retry, nothing more.
    rejected.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn rate_limited_response_surfaces_retry_after() {
    init_logging();
    let mut server = mockito::Server::new_async().await;

    let limited = server
        .mock("GET", "/marketdata/v1/quotes/SPY")
        .with_status(429)
        .with_header("Retry-After", "120")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let token_path = seed_tokens(&dir, 3600, 604_800);
    let client =
        SchwabClient::new(credentials(), config_for(&server.url(), token_path)).unwrap();

    let err = client.market_data().quote("SPY").await.unwrap_err();
    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_secs: 120
        }
    ));

    limited.assert_async().await;
}

#[tokio::test]
async fn authorize_from_callback_exchanges_code_and_persists() {
    init_logging();
    let mut server = mockito::Server::new_async().await;

    let exchange = server
        .mock("POST", "/v1/oauth/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            Matcher::UrlEncoded("code".into(), "ABC123".into()),
            Matcher::UrlEncoded("redirect_uri".into(), "https://127.0.0.1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"access_token": "new-access", "refresh_token": "new-refresh", "token_type": "Bearer", "expires_in": 1800}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let token_path = dir.path().join("tokens.json");
    let client = SchwabClient::new(
        credentials(),
        config_for(&server.url(), token_path.clone()),
    )
    .unwrap();

    assert!(!client.is_authenticated().await);
    client
        .authorize_from_callback("https://127.0.0.1/?code=ABC123&session=xyz")
        .await
        .unwrap();
    assert!(client.is_authenticated().await);

    let persisted: PersistedSession =
        serde_json::from_slice(&std::fs::read(&token_path).unwrap()).unwrap();
    assert_eq!(persisted.access_token, "new-access");
    assert_eq!(persisted.refresh_token, "new-refresh");
    assert!(persisted.access_expires_at <= persisted.refresh_expires_at);

    exchange.assert_async().await;
}

#[tokio::test]
async fn rejected_code_exchange_reports_authentication_error() {
    init_logging();
    let mut server = mockito::Server::new_async().await;

    let exchange = server
        .mock("POST", "/v1/oauth/token")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "invalid_grant", "error_description": "code expired"}"#)
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let client = SchwabClient::new(
        credentials(),
        config_for(&server.url(), dir.path().join("tokens.json")),
    )
    .unwrap();

    let err = client.authorize_with_code("STALE").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(msg) if msg.contains("authorization code")));
    assert!(!client.is_authenticated().await);

    exchange.assert_async().await;
}

#[tokio::test]
async fn place_order_returns_id_from_location_header() {
    init_logging();
    let mut server = mockito::Server::new_async().await;

    let placed = server
        .mock("POST", "/trader/v1/accounts/A1B2C3/orders")
        .match_header("authorization", "Bearer seed-access")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "orderType": "LIMIT",
            "session": "NORMAL",
            "duration": "DAY",
            "orderStrategyType": "SINGLE",
            "price": "211.50",
            "orderLegCollection": [{
                "instruction": "BUY",
                "quantity": 10,
                "instrument": { "symbol": "AAPL", "assetType": "EQUITY" }
            }]
        })))
        .with_status(201)
        .with_header(
            "Location",
            "https://api.schwabapi.com/trader/v1/accounts/A1B2C3/orders/1003811730601",
        )
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let token_path = seed_tokens(&dir, 3600, 604_800);
    let client =
        SchwabClient::new(credentials(), config_for(&server.url(), token_path)).unwrap();

    let order = OrderSpec::equity("AAPL", 10, Instruction::Buy)
        .order_type(OrderType::Limit)
        .price(rust_decimal_macros::dec!(211.50))
        .build()
        .unwrap();

    let account = AccountHash::new("A1B2C3");
    let order_id = client.orders().place(&account, &order).await.unwrap();
    assert_eq!(order_id, Some(OrderId::new("1003811730601")));

    placed.assert_async().await;
}
