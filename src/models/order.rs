//! Order construction and order response models.
//!
//! [`OrderSpec`] is the payload sent to the API; build one with
//! [`OrderBuilder`] or the [`OrderSpec::equity`] / [`OrderSpec::option`]
//! shortcuts. Prices serialize as strings (the form the API requires),
//! which `Decimal`'s serde implementation produces directly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::{
    AssetType, ComplexOrderStrategyType, Instruction, OrderDuration, OrderStatus,
    OrderStrategyType, OrderType, TradingSession,
};
use crate::{Error, Result};

/// Instrument reference inside an order leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentRef {
    /// Trading symbol, uppercase
    pub symbol: String,
    /// Asset class of the instrument
    pub asset_type: AssetType,
}

/// A single leg of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLeg {
    /// Action for this leg
    pub instruction: Instruction,
    /// Number of shares or contracts
    pub quantity: u32,
    /// The instrument being traded
    pub instrument: InstrumentRef,
}

impl OrderLeg {
    /// Create an equity leg.
    pub fn equity(symbol: impl AsRef<str>, quantity: u32, instruction: Instruction) -> Self {
        Self {
            instruction,
            quantity,
            instrument: InstrumentRef {
                symbol: symbol.as_ref().trim().to_uppercase(),
                asset_type: AssetType::Equity,
            },
        }
    }

    /// Create an option leg.
    pub fn option(symbol: impl AsRef<str>, quantity: u32, instruction: Instruction) -> Self {
        Self {
            instruction,
            quantity,
            instrument: InstrumentRef {
                symbol: symbol.as_ref().trim().to_uppercase(),
                asset_type: AssetType::Option,
            },
        }
    }
}

/// An order payload ready to be submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSpec {
    /// Order type
    pub order_type: OrderType,
    /// Trading session
    pub session: TradingSession,
    /// Duration
    pub duration: OrderDuration,
    /// Strategy type
    pub order_strategy_type: OrderStrategyType,
    /// Complex strategy classification, for multi-leg option orders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complex_order_strategy_type: Option<ComplexOrderStrategyType>,
    /// Limit price; serialized as a string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// Stop trigger price; serialized as a string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    /// The order legs
    pub order_leg_collection: Vec<OrderLeg>,
}

impl OrderSpec {
    /// Start building a single-leg equity order.
    pub fn equity(symbol: impl AsRef<str>, quantity: u32, instruction: Instruction) -> OrderBuilder {
        OrderBuilder::new().add_leg(OrderLeg::equity(symbol, quantity, instruction))
    }

    /// Start building a single-leg option order.
    pub fn option(symbol: impl AsRef<str>, quantity: u32, instruction: Instruction) -> OrderBuilder {
        OrderBuilder::new()
            .complex_strategy(ComplexOrderStrategyType::None)
            .add_leg(OrderLeg::option(symbol, quantity, instruction))
    }
}

/// Builder for [`OrderSpec`] with validation.
///
/// # Example
///
/// ```
/// use schwab_rs::models::{Instruction, OrderBuilder, OrderLeg, OrderType};
/// use rust_decimal_macros::dec;
///
/// let order = OrderBuilder::new()
///     .order_type(OrderType::Limit)
///     .price(dec!(150.00))
///     .add_leg(OrderLeg::equity("AAPL", 10, Instruction::Buy))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Default, Clone)]
pub struct OrderBuilder {
    order_type: Option<OrderType>,
    session: Option<TradingSession>,
    duration: Option<OrderDuration>,
    strategy: Option<OrderStrategyType>,
    complex_strategy: Option<ComplexOrderStrategyType>,
    price: Option<Decimal>,
    stop_price: Option<Decimal>,
    legs: Vec<OrderLeg>,
}

impl OrderBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the order type (default: market).
    pub fn order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = Some(order_type);
        self
    }

    /// Set the trading session (default: normal hours).
    pub fn session(mut self, session: TradingSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the order duration (default: day).
    pub fn duration(mut self, duration: OrderDuration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the order strategy type (default: single).
    pub fn strategy(mut self, strategy: OrderStrategyType) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Set the complex option strategy classification.
    pub fn complex_strategy(mut self, complex: ComplexOrderStrategyType) -> Self {
        self.complex_strategy = Some(complex);
        self
    }

    /// Set the limit price.
    pub fn price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the stop trigger price.
    pub fn stop_price(mut self, price: Decimal) -> Self {
        self.stop_price = Some(price);
        self
    }

    /// Add a leg to the order.
    pub fn add_leg(mut self, leg: OrderLeg) -> Self {
        self.legs.push(leg);
        self
    }

    /// Validate and build the order payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the order has no legs, a
    /// limit order has no price, or a stop order has no stop price.
    pub fn build(self) -> Result<OrderSpec> {
        if self.legs.is_empty() {
            return Err(Error::InvalidInput(
                "order must have at least one leg".to_string(),
            ));
        }

        let order_type = self.order_type.unwrap_or_default();
        match order_type {
            OrderType::Limit | OrderType::NetDebit | OrderType::NetCredit
                if self.price.is_none() =>
            {
                return Err(Error::InvalidInput(format!(
                    "{order_type:?} orders require a price"
                )));
            }
            OrderType::Stop | OrderType::StopLimit if self.stop_price.is_none() => {
                return Err(Error::InvalidInput(format!(
                    "{order_type:?} orders require a stop price"
                )));
            }
            _ => {}
        }
        if order_type == OrderType::StopLimit && self.price.is_none() {
            return Err(Error::InvalidInput(
                "StopLimit orders require a price".to_string(),
            ));
        }

        Ok(OrderSpec {
            order_type,
            session: self.session.unwrap_or_default(),
            duration: self.duration.unwrap_or_default(),
            order_strategy_type: self.strategy.unwrap_or_default(),
            complex_order_strategy_type: self.complex_strategy,
            price: self.price,
            stop_price: self.stop_price,
            order_leg_collection: self.legs,
        })
    }
}

/// A placed order as reported by the API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    /// Order ID
    #[serde(skip)]
    pub order_id: String,
    /// Plain account number the order belongs to
    #[serde(skip)]
    pub account_number: String,
    /// Current status
    pub status: Option<OrderStatus>,
    /// Order type
    pub order_type: Option<OrderType>,
    /// Trading session
    pub session: Option<TradingSession>,
    /// Duration
    pub duration: Option<OrderDuration>,
    /// When the order was entered
    pub entered_time: Option<String>,
    /// When the order reached a terminal state
    pub close_time: Option<String>,
    /// Total quantity
    pub quantity: Option<Decimal>,
    /// Quantity filled so far
    pub filled_quantity: Option<Decimal>,
    /// Quantity still working
    pub remaining_quantity: Option<Decimal>,
    /// Limit price
    pub price: Option<Decimal>,
    /// Stop trigger price
    pub stop_price: Option<Decimal>,
    /// The raw leg payloads
    #[serde(skip)]
    pub order_legs: Vec<Value>,
    /// Full API payload
    #[serde(skip)]
    pub raw: Value,
}

impl Order {
    pub(crate) fn from_value(value: Value) -> Result<Self> {
        let mut order: Order = serde_json::from_value(value.clone())?;

        // orderId and accountNumber arrive as JSON numbers.
        order.order_id = match value.get("orderId") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        order.account_number = match value.get("accountNumber") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        order.order_legs = value
            .get("orderLegCollection")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        order.raw = value;
        Ok(order)
    }
}
