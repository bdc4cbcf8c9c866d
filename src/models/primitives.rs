//! Primitive newtypes for type-safe API interactions.
//!
//! Schwab never exposes plain account numbers over the trading API; every
//! account-scoped endpoint takes the encrypted account hash returned by
//! the account-numbers endpoint. Wrapping the identifiers keeps hashes,
//! order ids, and symbols from being mixed up at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The encrypted account identifier used in trading endpoint paths.
///
/// Obtained from
/// [`AccountsService::account_numbers`](crate::api::AccountsService::account_numbers).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountHash(String);

impl AccountHash {
    /// Create a new account hash from a string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AccountHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccountHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A strongly-typed order ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Create a new order ID.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the order ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// A trading symbol (e.g., "AAPL", "SPY").
///
/// Symbols are normalized to uppercase with surrounding whitespace
/// trimmed, the form the API expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new symbol, normalizing case and whitespace.
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().trim().to_uppercase())
    }

    /// Get the symbol as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
