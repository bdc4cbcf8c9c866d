//! Market data models: quotes, instruments, option chains, price history.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::Result;

/// Snapshot quote for an instrument.
///
/// Quote payloads arrive either flat or nested under a `quote` key
/// depending on the endpoint; both shapes are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Quote {
    /// Trading symbol
    #[serde(skip)]
    pub symbol: String,
    /// Asset class reported by the API
    #[serde(skip)]
    pub asset_type: String,
    /// Best bid price
    pub bid_price: Option<Decimal>,
    /// Best ask price
    pub ask_price: Option<Decimal>,
    /// Last trade price
    pub last_price: Option<Decimal>,
    /// Best bid size
    pub bid_size: Option<u64>,
    /// Best ask size
    pub ask_size: Option<u64>,
    /// Last trade size
    pub last_size: Option<u64>,
    /// Total volume for the day
    pub total_volume: Option<u64>,
    /// Day's high
    pub high_price: Option<Decimal>,
    /// Day's low
    pub low_price: Option<Decimal>,
    /// Day's open
    pub open_price: Option<Decimal>,
    /// Previous close
    pub close_price: Option<Decimal>,
    /// Net change from previous close
    pub net_change: Option<Decimal>,
    /// Percent change from previous close
    pub net_percent_change: Option<Decimal>,
    /// Mark (midpoint) price
    #[serde(rename = "mark")]
    pub mark_price: Option<Decimal>,
    /// Quote timestamp, epoch milliseconds
    pub quote_time: Option<i64>,
    /// Last trade timestamp, epoch milliseconds
    pub trade_time: Option<i64>,
    /// Full API payload
    #[serde(skip)]
    pub raw: Value,
}

impl Quote {
    pub(crate) fn from_value(symbol: &str, value: Value) -> Result<Self> {
        let source = value
            .get("quote")
            .cloned()
            .unwrap_or_else(|| value.clone());
        let mut quote: Quote = serde_json::from_value(source)?;
        quote.symbol = symbol.to_string();
        quote.asset_type = value
            .get("assetType")
            .or_else(|| value.get("assetMainType"))
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();
        quote.raw = value;
        Ok(quote)
    }
}

/// A tradable instrument returned by search or CUSIP lookup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instrument {
    /// Trading symbol
    pub symbol: String,
    /// CUSIP identifier
    pub cusip: Option<String>,
    /// Instrument description
    pub description: Option<String>,
    /// Listing exchange
    pub exchange: Option<String>,
    /// Asset class
    pub asset_type: Option<String>,
    /// Full API payload
    #[serde(skip)]
    pub raw: Value,
}

impl Instrument {
    pub(crate) fn from_value(value: Value) -> Result<Self> {
        let mut instrument: Instrument = serde_json::from_value(value.clone())?;
        instrument.raw = value;
        Ok(instrument)
    }
}

/// An option chain for an underlying symbol.
///
/// The expiration maps are keyed by `"yyyy-MM-dd:daysToExpiration"` and
/// are left as raw JSON; their nested shape varies with the requested
/// strategy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionChain {
    /// Underlying symbol
    pub symbol: String,
    /// Chain status
    pub status: Option<String>,
    /// Price of the underlying at snapshot time
    pub underlying_price: Option<Decimal>,
    /// Call contracts keyed by expiration
    pub call_exp_date_map: Value,
    /// Put contracts keyed by expiration
    pub put_exp_date_map: Value,
    /// Full API payload
    #[serde(skip)]
    pub raw: Value,
}

impl OptionChain {
    pub(crate) fn from_value(value: Value) -> Result<Self> {
        let mut chain: OptionChain = serde_json::from_value(value.clone())?;
        chain.raw = value;
        Ok(chain)
    }
}

/// A single OHLCV bar from price history.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Candle {
    /// Opening price
    pub open: Option<Decimal>,
    /// High price
    pub high: Option<Decimal>,
    /// Low price
    pub low: Option<Decimal>,
    /// Closing price
    pub close: Option<Decimal>,
    /// Volume
    pub volume: Option<u64>,
    /// Bar timestamp, epoch milliseconds
    pub datetime: Option<i64>,
}

/// Price history (candles) for a symbol.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceHistory {
    /// Symbol the history is for
    pub symbol: String,
    /// Whether the API returned no data
    pub empty: Option<bool>,
    /// The OHLCV bars
    pub candles: Vec<Candle>,
    /// Full API payload
    #[serde(skip)]
    pub raw: Value,
}

impl PriceHistory {
    pub(crate) fn from_value(value: Value) -> Result<Self> {
        let mut history: PriceHistory = serde_json::from_value(value.clone())?;
        history.raw = value;
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_quote_from_nested_payload() {
        let payload = json!({
            "assetMainType": "EQUITY",
            "quote": {
                "bidPrice": 172.5,
                "askPrice": 172.62,
                "lastPrice": 172.55,
                "totalVolume": 34_567_890_u64,
                "mark": 172.56
            }
        });

        let quote = Quote::from_value("AAPL", payload.clone()).unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.asset_type, "EQUITY");
        assert_eq!(quote.bid_price, Some(dec!(172.5)));
        assert_eq!(quote.mark_price, Some(dec!(172.56)));
        assert_eq!(quote.raw, payload);
    }

    #[test]
    fn test_quote_from_flat_payload() {
        let payload = json!({
            "assetType": "INDEX",
            "lastPrice": 5123.25
        });

        let quote = Quote::from_value("$SPX", payload).unwrap();
        assert_eq!(quote.asset_type, "INDEX");
        assert_eq!(quote.last_price, Some(dec!(5123.25)));
        assert!(quote.bid_price.is_none());
    }

    #[test]
    fn test_option_chain_keeps_exp_date_maps() {
        let payload = json!({
            "symbol": "AAPL",
            "status": "SUCCESS",
            "underlyingPrice": 172.55,
            "callExpDateMap": { "2026-09-18:42": {} },
            "putExpDateMap": {}
        });

        let chain = OptionChain::from_value(payload).unwrap();
        assert_eq!(chain.symbol, "AAPL");
        assert_eq!(chain.underlying_price, Some(dec!(172.55)));
        assert!(chain.call_exp_date_map.get("2026-09-18:42").is_some());
    }

    #[test]
    fn test_price_history_candles() {
        let payload = json!({
            "symbol": "SPY",
            "empty": false,
            "candles": [
                { "open": 510.0, "high": 512.5, "low": 509.1, "close": 511.8,
                  "volume": 1_000_000_u64, "datetime": 1_754_000_000_000_i64 }
            ]
        });

        let history = PriceHistory::from_value(payload).unwrap();
        assert_eq!(history.symbol, "SPY");
        assert_eq!(history.candles.len(), 1);
        assert_eq!(history.candles[0].close, Some(dec!(511.8)));
    }
}
