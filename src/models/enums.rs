//! Enumeration types used in order payloads and responses.
//!
//! Schwab serializes all of these as SCREAMING_SNAKE_CASE strings.

use serde::{Deserialize, Serialize};

/// Order type specifying how the order should be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Execute immediately at current market price
    #[default]
    Market,
    /// Execute at the specified price or better
    Limit,
    /// Becomes a market order when the stop price is reached
    Stop,
    /// Becomes a limit order when the stop price is reached
    StopLimit,
    /// Multi-leg order priced as a net debit
    NetDebit,
    /// Multi-leg order priced as a net credit
    NetCredit,
    /// Trailing stop order
    TrailingStop,
}

/// Action to take for an order leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Instruction {
    /// Buy equities
    Buy,
    /// Sell equities
    Sell,
    /// Buy to cover a short equity position
    BuyToCover,
    /// Sell short
    SellShort,
    /// Buy to open a new option position
    BuyToOpen,
    /// Buy to close an existing short option position
    BuyToClose,
    /// Sell to open a new short option position
    SellToOpen,
    /// Sell to close an existing option position
    SellToClose,
}

impl Instruction {
    /// Returns `true` if this is a buy-side instruction.
    pub fn is_buy(&self) -> bool {
        matches!(
            self,
            Instruction::Buy
                | Instruction::BuyToCover
                | Instruction::BuyToOpen
                | Instruction::BuyToClose
        )
    }

    /// Returns `true` if this opens a new position.
    pub fn is_opening(&self) -> bool {
        matches!(
            self,
            Instruction::Buy
                | Instruction::SellShort
                | Instruction::BuyToOpen
                | Instruction::SellToOpen
        )
    }
}

/// How long an order remains active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderDuration {
    /// Expires at the end of the trading day
    #[default]
    Day,
    /// Remains active until filled or cancelled
    GoodTillCancel,
    /// Fill the entire order immediately or cancel it
    FillOrKill,
}

/// The trading session an order participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradingSession {
    /// Regular market hours
    #[default]
    Normal,
    /// Pre-market session
    Am,
    /// After-hours session
    Pm,
    /// All sessions
    Seamless,
}

/// Strategy type for the order as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStrategyType {
    /// A standalone order
    #[default]
    Single,
    /// One-cancels-other pair
    Oco,
    /// Order that triggers follow-up orders
    Trigger,
}

/// Complex option strategy classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplexOrderStrategyType {
    /// Not a complex strategy
    #[default]
    None,
    /// Custom multi-leg strategy
    Custom,
    /// Vertical spread
    Vertical,
}

/// Asset class of an instrument in an order leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    /// Common stock or ETF
    Equity,
    /// Option contract
    Option,
    /// Index
    Index,
    /// Mutual fund
    MutualFund,
    /// Money-market or similar cash instrument
    CashEquivalent,
    /// Bond
    FixedIncome,
    /// Currency
    Currency,
    /// Collective investment vehicle
    CollectiveInvestment,
}

/// Status of a placed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Waiting on a parent order
    AwaitingParentOrder,
    /// Waiting on an order condition
    AwaitingCondition,
    /// Waiting on a stop condition
    AwaitingStopCondition,
    /// Under manual review
    AwaitingManualReview,
    /// Accepted by the broker
    Accepted,
    /// Waiting for a cancel/replace of the paired order
    AwaitingUrOut,
    /// Waiting for activation
    PendingActivation,
    /// Queued for the trading session
    Queued,
    /// Live at the exchange
    Working,
    /// Rejected
    Rejected,
    /// Cancel requested, not yet confirmed
    PendingCancel,
    /// Cancelled
    Canceled,
    /// Replace requested, not yet confirmed
    PendingReplace,
    /// Replaced by another order
    Replaced,
    /// Completely filled
    Filled,
    /// Expired
    Expired,
    /// Newly entered
    New,
    /// Waiting for its release time
    AwaitingReleaseTime,
    /// Waiting for acknowledgement
    PendingAcknowledgement,
    /// Pending recall
    PendingRecall,
    /// Status not recognized by this client
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Returns `true` if the order can still fill.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Accepted
                | OrderStatus::PendingActivation
                | OrderStatus::Queued
                | OrderStatus::Working
                | OrderStatus::New
        )
    }

    /// Returns `true` if the order has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Rejected
                | OrderStatus::Canceled
                | OrderStatus::Replaced
                | OrderStatus::Filled
                | OrderStatus::Expired
        )
    }
}
