//! API service modules for Schwab endpoints.
//!
//! Each service is a stateless wrapper over the authenticated request
//! layer: it builds paths and parameters, and projects responses into
//! the typed models.

mod accounts;
mod market_data;
mod orders;

pub use accounts::{AccountNumberMapping, AccountsService};
pub use market_data::{MarketDataService, OptionChainQuery, PriceHistoryQuery};
pub use orders::{OrdersQuery, OrdersService};
