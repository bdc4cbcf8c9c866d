//! Accounts service: account details, positions, balances, transactions.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::client::ClientInner;
use crate::models::{Account, AccountHash, Balance, Position};
use crate::Result;

/// Mapping from a plain account number to the encrypted hash used in
/// trading endpoint paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountNumberMapping {
    /// The plain account number
    pub account_number: String,
    /// The encrypted hash to use in API paths
    pub hash_value: String,
}

impl AccountNumberMapping {
    /// The hash as a typed [`AccountHash`].
    pub fn hash(&self) -> AccountHash {
        AccountHash::new(&self.hash_value)
    }
}

/// Service for account-related operations.
///
/// # Example
///
/// ```no_run
/// # async fn example(client: schwab_rs::SchwabClient) -> schwab_rs::Result<()> {
/// let mappings = client.accounts().account_numbers().await?;
/// let hash = mappings[0].hash();
///
/// let balance = client.accounts().balance(&hash).await?;
/// println!("cash: {:?}", balance.cash_balance);
/// # Ok(())
/// # }
/// ```
pub struct AccountsService {
    inner: Arc<ClientInner>,
}

impl AccountsService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Get the account-number-to-hash mappings for all linked accounts.
    ///
    /// Every other account-scoped call takes the hash, never the plain
    /// account number.
    pub async fn account_numbers(&self) -> Result<Vec<AccountNumberMapping>> {
        self.inner.get("/trader/v1/accounts/accountNumbers").await
    }

    /// Get all linked accounts.
    ///
    /// Pass `fields = Some("positions")` to include position data.
    pub async fn list(&self, fields: Option<&str>) -> Result<Vec<Account>> {
        let value: Value = match fields {
            Some(fields) => {
                self.inner
                    .get_with_query("/trader/v1/accounts", &[("fields", fields)])
                    .await?
            }
            None => self.inner.get("/trader/v1/accounts").await?,
        };

        value
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(Account::from_value)
            .collect()
    }

    /// Get a specific account.
    pub async fn get(&self, account: &AccountHash, fields: Option<&str>) -> Result<Account> {
        let path = format!("/trader/v1/accounts/{account}");
        let value: Value = match fields {
            Some(fields) => {
                self.inner
                    .get_with_query(&path, &[("fields", fields)])
                    .await?
            }
            None => self.inner.get(&path).await?,
        };
        Account::from_value(value)
    }

    /// Get all positions for an account.
    pub async fn positions(&self, account: &AccountHash) -> Result<Vec<Position>> {
        let account = self.get(account, Some("positions")).await?;

        account
            .raw
            .get("securitiesAccount")
            .and_then(|a| a.get("positions"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(Position::from_value)
            .collect()
    }

    /// Get the balance snapshot for an account.
    pub async fn balance(&self, account: &AccountHash) -> Result<Balance> {
        let account = self.get(account, None).await?;
        let source = account
            .raw
            .get("securitiesAccount")
            .cloned()
            .unwrap_or(account.raw);
        Balance::from_value(source)
    }

    /// Get transactions for an account within a date range.
    ///
    /// `types` is a comma-separated list of transaction types; `symbol`
    /// filters to a single instrument.
    pub async fn transactions(
        &self,
        account: &AccountHash,
        start_date: chrono::NaiveDate,
        end_date: chrono::NaiveDate,
        types: Option<&str>,
        symbol: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut params = vec![
            ("startDate", start_date.format("%Y-%m-%d").to_string()),
            ("endDate", end_date.format("%Y-%m-%d").to_string()),
        ];
        if let Some(types) = types {
            params.push(("types", types.to_string()));
        }
        if let Some(symbol) = symbol {
            params.push(("symbol", symbol.to_string()));
        }

        let value: Value = self
            .inner
            .get_with_query(&format!("/trader/v1/accounts/{account}/transactions"), &params)
            .await?;
        Ok(value.as_array().cloned().unwrap_or_default())
    }

    /// Get a specific transaction.
    pub async fn transaction(
        &self,
        account: &AccountHash,
        transaction_id: &str,
    ) -> Result<Value> {
        self.inner
            .get(&format!(
                "/trader/v1/accounts/{account}/transactions/{transaction_id}"
            ))
            .await
    }

    /// Get user preferences (includes streamer connection info).
    pub async fn user_preference(&self) -> Result<Value> {
        self.inner.get("/trader/v1/userPreference").await
    }
}
