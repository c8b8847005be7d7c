//! The `BrokerAdapter` capability (consumed), per spec.md §6.1.
//!
//! Out of scope per spec.md §1: "the brokerage REST/WebSocket transport
//! (authentication, rate limiting, TR-ID catalogs, endpoint URLs)". This
//! module only defines the seam the core engine drives and ships a
//! deterministic [`MockBrokerAdapter`] for tests and the `demos` crate.

use crate::{balance::AccountBalance, error::BrokerError, order::{Order, OrderId}};
use async_trait::async_trait;
use meridian_instrument::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of a broker submission/cancellation call, per spec.md §6.1.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderResult {
    pub success: bool,
    pub broker_order_id: Option<String>,
    pub message: Option<String>,
    pub error_code: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl OrderResult {
    pub fn accepted(broker_order_id: impl Into<String>) -> Self {
        Self {
            success: true,
            broker_order_id: Some(broker_order_id.into()),
            message: None,
            error_code: None,
            metadata: HashMap::new(),
        }
    }
}

/// Position snapshot as reported directly by the broker (distinct from the
/// core's authoritative [`meridian_core`]-owned `Position`, used only to
/// reconcile against `BrokerAdapter::get_positions`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BrokerPosition {
    pub symbol: Symbol,
    pub quantity: rust_decimal::Decimal,
    pub average_price: rust_decimal::Decimal,
}

/// Capability the core calls to submit/cancel orders and query broker-side
/// truth. Every operation is fallible with the categorized [`BrokerError`]
/// taxonomy from spec.md §4.3 / §7.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    async fn place_order(&self, order: &Order) -> Result<OrderResult, BrokerError>;

    async fn cancel_order(&self, order_id: &OrderId) -> Result<OrderResult, BrokerError>;

    async fn get_order_status(&self, order_id: &OrderId) -> Result<Option<Order>, BrokerError>;

    async fn get_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError>;

    async fn get_account_balance(&self) -> Result<AccountBalance, BrokerError>;
}

/// A scriptable, in-memory [`BrokerAdapter`] for deterministic tests and
/// the `demos` smoke-test binaries. Every `place_order` call succeeds
/// immediately unless `reject_next` has been armed.
#[derive(Debug)]
pub struct MockBrokerAdapter {
    balance: parking_lot::Mutex<AccountBalance>,
    next_broker_order_id: std::sync::atomic::AtomicU64,
    reject_next: parking_lot::Mutex<Option<BrokerError>>,
}

impl MockBrokerAdapter {
    pub fn new(balance: AccountBalance) -> Self {
        Self {
            balance: parking_lot::Mutex::new(balance),
            next_broker_order_id: std::sync::atomic::AtomicU64::new(1),
            reject_next: parking_lot::Mutex::new(None),
        }
    }

    /// Arms the next `place_order` call to fail with `error`.
    pub fn reject_next_order(&self, error: BrokerError) {
        *self.reject_next.lock() = Some(error);
    }

    pub fn set_balance(&self, balance: AccountBalance) {
        *self.balance.lock() = balance;
    }
}

#[async_trait]
impl BrokerAdapter for MockBrokerAdapter {
    async fn place_order(&self, _order: &Order) -> Result<OrderResult, BrokerError> {
        if let Some(err) = self.reject_next.lock().take() {
            return Err(err);
        }
        let id = self
            .next_broker_order_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(OrderResult::accepted(format!("mock-{id}")))
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<OrderResult, BrokerError> {
        Ok(OrderResult::accepted(order_id.0.clone()))
    }

    async fn get_order_status(&self, _order_id: &OrderId) -> Result<Option<Order>, BrokerError> {
        Ok(None)
    }

    async fn get_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
        Ok(Vec::new())
    }

    async fn get_account_balance(&self) -> Result<AccountBalance, BrokerError> {
        Ok(*self.balance.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderId as Oid;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn mock_broker_accepts_by_default_and_rejects_when_armed() {
        let broker = MockBrokerAdapter::new(AccountBalance::new(dec!(1_000_000), dec!(1_000_000)));
        let order = crate::order::Order::new(
            Oid::new("o1".into()),
            Symbol::new("005930"),
            meridian_instrument::Side::Buy,
            meridian_instrument::OrderType::Market,
            dec!(1),
            None,
            None,
            meridian_instrument::TimeInForce::Day,
            None,
            chrono::Utc::now(),
            HashMap::new(),
        )
        .unwrap();

        let result = broker.place_order(&order).await.unwrap();
        assert!(result.success);

        broker.reject_next_order(BrokerError::MarketClosed("closed".into()));
        let err = broker.place_order(&order).await.unwrap_err();
        assert!(matches!(err, BrokerError::MarketClosed(_)));
    }
}
