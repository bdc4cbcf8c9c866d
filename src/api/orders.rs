//! Orders service: placement, replacement, cancellation, and listing.
//!
//! Nothing in this service retries on its own; a failed placement
//! surfaces immediately so the caller decides whether submitting again
//! is safe.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::client::ClientInner;
use crate::models::{AccountHash, Order, OrderId, OrderSpec, OrderStatus};
use crate::Result;

/// Service for order operations.
///
/// # Example
///
/// ```no_run
/// use schwab_rs::models::{AccountHash, Instruction, OrderSpec, OrderType};
/// use rust_decimal_macros::dec;
///
/// # async fn example(client: schwab_rs::SchwabClient) -> schwab_rs::Result<()> {
/// let account = AccountHash::new("A1B2C3D4E5");
///
/// let order = OrderSpec::equity("AAPL", 10, Instruction::Buy)
///     .order_type(OrderType::Limit)
///     .price(dec!(150.00))
///     .build()?;
///
/// if let Some(order_id) = client.orders().place(&account, &order).await? {
///     println!("placed order {order_id}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct OrdersService {
    inner: Arc<ClientInner>,
}

/// Query parameters for listing orders.
#[derive(Debug, Clone, Default)]
pub struct OrdersQuery {
    /// Maximum number of orders to return (API default: 3000)
    pub max_results: Option<u32>,
    /// Only orders entered at or after this time
    pub from_entered_time: Option<DateTime<Utc>>,
    /// Only orders entered at or before this time
    pub to_entered_time: Option<DateTime<Utc>>,
    /// Filter by status
    pub status: Option<OrderStatus>,
}

impl OrdersQuery {
    fn into_params(self) -> Vec<(&'static str, String)> {
        let mut params = vec![(
            "maxResults",
            self.max_results.unwrap_or(3000).to_string(),
        )];
        if let Some(from) = self.from_entered_time {
            params.push((
                "fromEnteredTime",
                from.to_rfc3339_opts(SecondsFormat::Millis, true),
            ));
        }
        if let Some(to) = self.to_entered_time {
            params.push((
                "toEnteredTime",
                to.to_rfc3339_opts(SecondsFormat::Millis, true),
            ));
        }
        if let Some(status) = self.status {
            // Serialize through serde so the wire form always matches.
            if let Ok(Value::String(s)) = serde_json::to_value(status) {
                params.push(("status", s));
            }
        }
        params
    }
}

impl OrdersService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Place an order.
    ///
    /// Returns the new order's ID when the API reports it via the
    /// `Location` header.
    pub async fn place(
        &self,
        account: &AccountHash,
        order: &OrderSpec,
    ) -> Result<Option<OrderId>> {
        let location = self
            .inner
            .post_for_location(&format!("/trader/v1/accounts/{account}/orders"), order)
            .await?;
        Ok(location.as_deref().and_then(order_id_from_location))
    }

    /// Replace an existing order with a new specification.
    ///
    /// The existing order must still be in a replaceable state.
    pub async fn replace(
        &self,
        account: &AccountHash,
        order_id: &OrderId,
        order: &OrderSpec,
    ) -> Result<()> {
        self.inner
            .put_empty(
                &format!("/trader/v1/accounts/{account}/orders/{order_id}"),
                order,
            )
            .await
    }

    /// Cancel an order.
    pub async fn cancel(&self, account: &AccountHash, order_id: &OrderId) -> Result<()> {
        self.inner
            .delete_empty(&format!("/trader/v1/accounts/{account}/orders/{order_id}"))
            .await
    }

    /// Get a specific order.
    pub async fn get(&self, account: &AccountHash, order_id: &OrderId) -> Result<Order> {
        let value: Value = self
            .inner
            .get(&format!("/trader/v1/accounts/{account}/orders/{order_id}"))
            .await?;
        Order::from_value(value)
    }

    /// List orders for an account.
    pub async fn list(
        &self,
        account: &AccountHash,
        query: Option<OrdersQuery>,
    ) -> Result<Vec<Order>> {
        let params = query.unwrap_or_default().into_params();
        let value: Value = self
            .inner
            .get_with_query(&format!("/trader/v1/accounts/{account}/orders"), &params)
            .await?;
        collect_orders(value)
    }

    /// List orders across all linked accounts.
    pub async fn all(&self, query: Option<OrdersQuery>) -> Result<Vec<Order>> {
        let params = query.unwrap_or_default().into_params();
        let value: Value = self
            .inner
            .get_with_query("/trader/v1/orders", &params)
            .await?;
        collect_orders(value)
    }

    /// Preview an order without placing it.
    pub async fn preview(&self, account: &AccountHash, order: &OrderSpec) -> Result<Value> {
        self.inner
            .post(
                &format!("/trader/v1/accounts/{account}/previewOrder"),
                order,
            )
            .await
    }
}

fn collect_orders(value: Value) -> Result<Vec<Order>> {
    value
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(Order::from_value)
        .collect()
}

/// The Location header ends in `/orders/{orderId}`.
fn order_id_from_location(location: &str) -> Option<OrderId> {
    let id = location.trim_end_matches('/').rsplit('/').next()?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(OrderId::new(id))
}
