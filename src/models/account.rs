//! Account, position, and balance models.
//!
//! Each model is a thin typed projection over the API payload: the fields
//! a caller usually wants are lifted out, and the complete original
//! response is retained in the `raw` field for anything the projection
//! does not cover.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::Result;

/// A Schwab brokerage account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Account {
    /// Plain account number
    pub account_number: String,
    /// Account type (e.g., "MARGIN", "CASH")
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    /// Whether the account is flagged as a pattern day trader
    pub is_day_trader: Option<bool>,
    /// Whether the account is restricted to closing trades
    pub is_closing_only_restricted: Option<bool>,
    /// Number of round trips counted against the PDT rule
    pub round_trips: Option<i64>,
    /// Full API payload
    #[serde(skip)]
    pub raw: Value,
}

impl Account {
    /// Build an account from the API payload, which nests the details
    /// under `securitiesAccount`.
    pub(crate) fn from_value(value: Value) -> Result<Self> {
        let source = value
            .get("securitiesAccount")
            .cloned()
            .unwrap_or_else(|| value.clone());
        let mut account: Account = serde_json::from_value(source)?;
        account.raw = value;
        Ok(account)
    }
}

/// A position held in an account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Position {
    /// Instrument symbol
    #[serde(skip)]
    pub symbol: String,
    /// Asset type of the instrument
    #[serde(skip)]
    pub asset_type: String,
    /// Net signed quantity (long minus short)
    #[serde(skip)]
    pub quantity: Decimal,
    /// Shares/contracts held long
    pub long_quantity: Option<Decimal>,
    /// Shares/contracts held short
    pub short_quantity: Option<Decimal>,
    /// Average entry price
    pub average_price: Option<Decimal>,
    /// Current market value of the position
    pub market_value: Option<Decimal>,
    /// Profit/loss for the current day
    pub current_day_profit_loss: Option<Decimal>,
    /// Profit/loss for the current day, as a percentage
    pub current_day_profit_loss_percentage: Option<Decimal>,
    /// The nested instrument payload
    #[serde(skip)]
    pub instrument: Value,
    /// Full API payload
    #[serde(skip)]
    pub raw: Value,
}

impl Position {
    pub(crate) fn from_value(value: Value) -> Result<Self> {
        let mut position: Position = serde_json::from_value(value.clone())?;

        let instrument = value.get("instrument").cloned().unwrap_or(Value::Null);
        position.symbol = instrument
            .get("symbol")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        position.asset_type = instrument
            .get("assetType")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        position.quantity = position.long_quantity.unwrap_or_default()
            - position.short_quantity.unwrap_or_default();
        position.instrument = instrument;
        position.raw = value;
        Ok(position)
    }
}

/// Account balance snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Balance {
    /// Settled cash
    pub cash_balance: Option<Decimal>,
    /// Net liquidation value
    pub liquidation_value: Option<Decimal>,
    /// Market value of long positions
    pub long_market_value: Option<Decimal>,
    /// Market value of short positions
    pub short_market_value: Option<Decimal>,
    /// Account equity
    pub equity: Option<Decimal>,
    /// Buying power
    pub buying_power: Option<Decimal>,
    /// Margin balance
    pub margin_balance: Option<Decimal>,
    /// Funds available for trading
    pub available_funds: Option<Decimal>,
    /// Full API payload
    #[serde(skip)]
    pub raw: Value,
}

impl Balance {
    /// Build a balance from the `securitiesAccount` payload, which nests
    /// the figures under `currentBalances`.
    pub(crate) fn from_value(value: Value) -> Result<Self> {
        let source = value
            .get("currentBalances")
            .cloned()
            .unwrap_or_else(|| value.clone());
        let mut balance: Balance = serde_json::from_value(source)?;
        balance.raw = value;
        Ok(balance)
    }
}
