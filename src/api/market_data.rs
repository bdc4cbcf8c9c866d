//! Market data service: quotes, option chains, price history, instrument
//! search.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::client::ClientInner;
use crate::models::{Instrument, OptionChain, PriceHistory, Quote, Symbol};
use crate::{Error, Result};

/// Service for market data operations.
///
/// # Example
///
/// ```no_run
/// # async fn example(client: schwab_rs::SchwabClient) -> schwab_rs::Result<()> {
/// let quote = client.market_data().quote("AAPL").await?;
/// println!("AAPL: bid={:?} ask={:?}", quote.bid_price, quote.ask_price);
///
/// let quotes = client.market_data().quotes(&["AAPL", "MSFT", "GOOGL"]).await?;
/// for (symbol, quote) in &quotes {
///     println!("{symbol}: {:?}", quote.last_price);
/// }
/// # Ok(())
/// # }
/// ```
pub struct MarketDataService {
    inner: Arc<ClientInner>,
}

impl MarketDataService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Get a quote for a single symbol.
    pub async fn quote(&self, symbol: &str) -> Result<Quote> {
        let symbol = Symbol::new(symbol);
        let value: Value = self
            .inner
            .get(&format!("/marketdata/v1/quotes/{symbol}"))
            .await?;

        // The payload is keyed by symbol; fall back to the body itself
        // for single-quote responses that skip the wrapper.
        let payload = value
            .get(symbol.as_str())
            .cloned()
            .unwrap_or_else(|| value.clone());
        Quote::from_value(symbol.as_str(), payload)
    }

    /// Get quotes for multiple symbols, keyed by symbol.
    ///
    /// Symbols the API does not recognize are simply absent from the
    /// result map.
    pub async fn quotes(&self, symbols: &[&str]) -> Result<HashMap<String, Quote>> {
        let normalized: Vec<String> = symbols
            .iter()
            .map(|s| Symbol::new(s).as_str().to_string())
            .collect();
        let params = [
            ("symbols", normalized.join(",")),
            ("indicative", "false".to_string()),
        ];

        let value: Value = self
            .inner
            .get_with_query("/marketdata/v1/quotes", &params)
            .await?;

        let mut quotes = HashMap::new();
        if let Some(entries) = value.as_object() {
            for (symbol, payload) in entries {
                quotes.insert(
                    symbol.clone(),
                    Quote::from_value(symbol, payload.clone())?,
                );
            }
        }
        Ok(quotes)
    }

    /// Get the option chain for an underlying symbol.
    pub async fn option_chain(
        &self,
        symbol: &str,
        query: OptionChainQuery,
    ) -> Result<OptionChain> {
        let symbol = Symbol::new(symbol);
        let params = query.into_params(symbol.as_str());
        let value: Value = self
            .inner
            .get_with_query("/marketdata/v1/chains", &params)
            .await?;
        OptionChain::from_value(value)
    }

    /// Get option expiration dates for a symbol.
    pub async fn option_expiration_chain(&self, symbol: &str) -> Result<Value> {
        let symbol = Symbol::new(symbol);
        self.inner
            .get(&format!("/marketdata/v1/expirationchain/{symbol}"))
            .await
    }

    /// Get price history (candles) for a symbol.
    pub async fn price_history(
        &self,
        symbol: &str,
        query: PriceHistoryQuery,
    ) -> Result<PriceHistory> {
        let symbol = Symbol::new(symbol);
        let params = query.into_params();
        let value: Value = self
            .inner
            .get_with_query(&format!("/marketdata/v1/pricehistory/{symbol}"), &params)
            .await?;
        PriceHistory::from_value(value)
    }

    /// Get market hours for the given markets (equity, option, bond,
    /// future, forex).
    pub async fn market_hours(&self, markets: &[&str], date: Option<NaiveDate>) -> Result<Value> {
        let mut params = vec![("markets", markets.join(","))];
        if let Some(date) = date {
            params.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        self.inner
            .get_with_query("/marketdata/v1/markets", &params)
            .await
    }

    /// Get market movers for an index symbol ($DJI, $COMPX, $SPX).
    pub async fn movers(
        &self,
        index_symbol: &str,
        sort: Option<&str>,
        frequency: Option<u32>,
    ) -> Result<Vec<Value>> {
        let mut params = vec![("sort", sort.unwrap_or("PERCENT_CHANGE_UP").to_string())];
        params.push(("frequency", frequency.unwrap_or(0).to_string()));

        let value: Value = self
            .inner
            .get_with_query(&format!("/marketdata/v1/movers/{index_symbol}"), &params)
            .await?;
        Ok(value
            .get("screeners")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Search for instruments by symbol or description.
    ///
    /// `projection` is one of `symbol-search`, `symbol-regex`,
    /// `desc-search`, `desc-regex`, `search`, or `fundamental`.
    pub async fn search_instruments(
        &self,
        symbol: &str,
        projection: &str,
    ) -> Result<Vec<Instrument>> {
        let params = [("symbol", symbol), ("projection", projection)];
        let value: Value = self
            .inner
            .get_with_query("/marketdata/v1/instruments", &params)
            .await?;
        collect_instruments(value)
    }

    /// Look up an instrument by CUSIP.
    pub async fn instrument_by_cusip(&self, cusip: &str) -> Result<Instrument> {
        let value: Value = self
            .inner
            .get(&format!("/marketdata/v1/instruments/{cusip}"))
            .await?;
        collect_instruments(value)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("no instrument found for CUSIP {cusip}")))
    }
}

fn collect_instruments(value: Value) -> Result<Vec<Instrument>> {
    let entries = match value.get("instruments").and_then(Value::as_array) {
        Some(list) => list.clone(),
        None => value
            .as_object()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default(),
    };
    entries.into_iter().map(Instrument::from_value).collect()
}

/// Query parameters for [`MarketDataService::option_chain`].
///
/// The defaults mirror the API's: single-contract strategy, all strikes,
/// all expirations, with the underlying quote included.
#[derive(Debug, Clone)]
pub struct OptionChainQuery {
    /// Contract type filter (CALL, PUT, ALL)
    pub contract_type: Option<String>,
    /// Number of strikes above/below at-the-money
    pub strike_count: Option<u32>,
    /// Include a quote for the underlying
    pub include_underlying_quote: bool,
    /// Option strategy (SINGLE, ANALYTICAL, COVERED, VERTICAL, ...)
    pub strategy: String,
    /// Strike interval for spread strategies
    pub interval: Option<Decimal>,
    /// Filter to a single strike price
    pub strike: Option<Decimal>,
    /// Range filter (ITM, NTM, OTM, ALL, ...)
    pub range: String,
    /// Earliest expiration to include
    pub from_date: Option<NaiveDate>,
    /// Latest expiration to include
    pub to_date: Option<NaiveDate>,
    /// Volatility override for ANALYTICAL strategy
    pub volatility: Option<Decimal>,
    /// Underlying price override for ANALYTICAL strategy
    pub underlying_price: Option<Decimal>,
    /// Interest rate override for ANALYTICAL strategy
    pub interest_rate: Option<Decimal>,
    /// Days-to-expiration override for ANALYTICAL strategy
    pub days_to_expiration: Option<u32>,
    /// Expiration month filter (JAN..DEC, ALL)
    pub exp_month: String,
    /// Option type filter (S, NS, ALL)
    pub option_type: String,
    /// Entitlement (PN, NP, PP)
    pub entitlement: String,
}

impl Default for OptionChainQuery {
    fn default() -> Self {
        Self {
            contract_type: None,
            strike_count: None,
            include_underlying_quote: true,
            strategy: "SINGLE".to_string(),
            interval: None,
            strike: None,
            range: "ALL".to_string(),
            from_date: None,
            to_date: None,
            volatility: None,
            underlying_price: None,
            interest_rate: None,
            days_to_expiration: None,
            exp_month: "ALL".to_string(),
            option_type: "ALL".to_string(),
            entitlement: "PN".to_string(),
        }
    }
}

impl OptionChainQuery {
    fn into_params(self, symbol: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("symbol", symbol.to_string()),
            (
                "includeUnderlyingQuote",
                self.include_underlying_quote.to_string(),
            ),
            ("strategy", self.strategy),
            ("range", self.range),
            ("expMonth", self.exp_month),
            ("optionType", self.option_type),
            ("entitlement", self.entitlement),
        ];

        if let Some(contract_type) = self.contract_type {
            params.push(("contractType", contract_type));
        }
        if let Some(strike_count) = self.strike_count {
            params.push(("strikeCount", strike_count.to_string()));
        }
        if let Some(interval) = self.interval {
            params.push(("interval", interval.to_string()));
        }
        if let Some(strike) = self.strike {
            params.push(("strike", strike.to_string()));
        }
        if let Some(from_date) = self.from_date {
            params.push(("fromDate", from_date.format("%Y-%m-%d").to_string()));
        }
        if let Some(to_date) = self.to_date {
            params.push(("toDate", to_date.format("%Y-%m-%d").to_string()));
        }
        if let Some(volatility) = self.volatility {
            params.push(("volatility", volatility.to_string()));
        }
        if let Some(underlying_price) = self.underlying_price {
            params.push(("underlyingPrice", underlying_price.to_string()));
        }
        if let Some(interest_rate) = self.interest_rate {
            params.push(("interestRate", interest_rate.to_string()));
        }
        if let Some(days) = self.days_to_expiration {
            params.push(("daysToExpiration", days.to_string()));
        }
        params
    }
}

/// Query parameters for [`MarketDataService::price_history`].
#[derive(Debug, Clone)]
pub struct PriceHistoryQuery {
    /// Period type: day, month, year, ytd
    pub period_type: String,
    /// Number of periods
    pub period: Option<u32>,
    /// Frequency type: minute, daily, weekly, monthly
    pub frequency_type: Option<String>,
    /// Frequency within the frequency type
    pub frequency: Option<u32>,
    /// Start, epoch milliseconds (overrides period)
    pub start_date: Option<i64>,
    /// End, epoch milliseconds
    pub end_date: Option<i64>,
    /// Include extended-hours data
    pub need_extended_hours: bool,
    /// Include the previous close
    pub need_previous_close: bool,
}

impl Default for PriceHistoryQuery {
    fn default() -> Self {
        Self {
            period_type: "day".to_string(),
            period: None,
            frequency_type: None,
            frequency: None,
            start_date: None,
            end_date: None,
            need_extended_hours: true,
            need_previous_close: true,
        }
    }
}

impl PriceHistoryQuery {
    fn into_params(self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("periodType", self.period_type),
            (
                "needExtendedHoursData",
                self.need_extended_hours.to_string(),
            ),
            ("needPreviousClose", self.need_previous_close.to_string()),
        ];

        if let Some(period) = self.period {
            params.push(("period", period.to_string()));
        }
        if let Some(frequency_type) = self.frequency_type {
            params.push(("frequencyType", frequency_type));
        }
        if let Some(frequency) = self.frequency {
            params.push(("frequency", frequency.to_string()));
        }
        if let Some(start_date) = self.start_date {
            params.push(("startDate", start_date.to_string()));
        }
        if let Some(end_date) = self.end_date {
            params.push(("endDate", end_date.to_string()));
        }
        params
    }
}
