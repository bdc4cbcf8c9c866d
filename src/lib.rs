//! # schwab-rs
//!
//! A Rust client for the Schwab brokerage REST API.
//!
//! The crate wraps the market data, account, and order endpoints behind
//! typed services, and manages the OAuth 2.0 session for you: the token
//! pair is persisted to disk, the access token is refreshed automatically
//! before it expires, and a request rejected by the API triggers exactly
//! one forced refresh and retry.
//!
//! ## Authentication
//!
//! Schwab uses the authorization-code grant. Setup is a one-time
//! interactive step; afterwards the persisted refresh token keeps the
//! session alive for up to 7 days at a stretch without user involvement.
//!
//! ```no_run
//! use schwab_rs::{Credentials, SchwabClient};
//!
//! #[tokio::main]
//! async fn main() -> schwab_rs::Result<()> {
//!     let client = SchwabClient::with_defaults(Credentials::new(
//!         "your-app-key",
//!         "your-app-secret",
//!         "https://127.0.0.1",
//!     ))?;
//!
//!     if !client.is_authenticated().await {
//!         println!("visit this URL and authorize: {}", client.authorization_url()?);
//!         // After authorizing you are redirected to something like
//!         // https://127.0.0.1/?code=...; paste the whole URL back:
//!         let callback = "https://127.0.0.1/?code=...";
//!         client.authorize_from_callback(callback).await?;
//!     }
//!
//!     let quote = client.market_data().quote("AAPL").await?;
//!     println!("AAPL: {:?}", quote.last_price);
//!     Ok(())
//! }
//! ```
//!
//! ## Placing an order
//!
//! ```no_run
//! use schwab_rs::models::{Instruction, OrderSpec, OrderType};
//! use rust_decimal_macros::dec;
//!
//! # async fn example(client: schwab_rs::SchwabClient) -> schwab_rs::Result<()> {
//! let mappings = client.accounts().account_numbers().await?;
//! let account = mappings[0].hash();
//!
//! let order = OrderSpec::equity("AAPL", 10, Instruction::Buy)
//!     .order_type(OrderType::Limit)
//!     .price(dec!(150.00))
//!     .build()?;
//!
//! let order_id = client.orders().place(&account, &order).await?;
//! println!("placed: {order_id:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error handling
//!
//! All operations return [`Result`]. Authentication problems surface as
//! [`Error::Authentication`] or, when the refresh token itself has
//! expired, [`Error::RefreshTokenExpired`]; the latter means the
//! authorization flow must be re-run. Rate limiting surfaces immediately
//! as [`Error::RateLimited`]; the library never retries on its own
//! beyond the single refresh-and-retry on an unauthorized response.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;

// Re-export primary types at crate root for convenience
pub use auth::{Credentials, OAuthFlow, TokenManager, TokenStore};
pub use client::{ClientConfig, SchwabClient};
pub use error::{Error, Result};
pub use models::{AccountHash, OrderId, Symbol};

/// Prelude module for convenient imports.
///
/// ```rust
/// use schwab_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::api::{
        AccountNumberMapping, AccountsService, MarketDataService, OptionChainQuery,
        OrdersQuery, OrdersService, PriceHistoryQuery,
    };
    pub use crate::auth::Credentials;
    pub use crate::client::{ClientConfig, SchwabClient};
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        Account, AccountHash, AssetType, Balance, Candle, Instruction, Instrument, Order,
        OrderBuilder, OrderDuration, OrderId, OrderLeg, OrderSpec, OrderStatus, OrderType,
        OptionChain, Position, PriceHistory, Quote, Symbol, TradingSession,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_reexport() {
        let symbol = Symbol::new("aapl");
        assert_eq!(symbol.as_str(), "AAPL");
    }

    #[test]
    fn test_default_config_points_at_production() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://api.schwabapi.com");
        assert_eq!(config.auth_base_url, "https://api.schwabapi.com");
    }
}
