//! Error taxonomy for order entities and broker communication, per spec.md
//! §4.3 "Errors" and §7.

use crate::order::OrderId;
use meridian_instrument::OrderType;
use rust_decimal::Decimal;
use thiserror::Error;

/// Violations of the `Order` schema invariants from spec.md §3.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),
    #[error("order type {0:?} requires a price")]
    MissingPrice(OrderType),
    #[error("order type {0:?} requires a stop_price")]
    MissingStopPrice(OrderType),
    #[error(
        "fill of {incoming} on order {order_id} would exceed total quantity {total} \
         (already filled {filled})"
    )]
    FillExceedsQuantity {
        order_id: OrderId,
        filled: Decimal,
        incoming: Decimal,
        total: Decimal,
    },
}

/// Broker error categories, per spec.md §4.3 "Errors" and §7.
///
/// Determines retry policy in the Order Engine (C7): `Auth`/`Transport` are
/// retried with bounded exponential backoff, `RateLimit` is retried after a
/// delay, the remainder are terminal and produce `ORDER_FAILED`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrokerError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("rate limited, retry after {retry_after_ms}ms: {message}")]
    RateLimit { message: String, retry_after_ms: u64 },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("market closed: {0}")]
    MarketClosed(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unknown broker error: {0}")]
    Unknown(String),
}

impl BrokerError {
    /// `true` for categories the Order Engine should retry (spec.md §7).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BrokerError::Auth(_) | BrokerError::RateLimit { .. } | BrokerError::Transport(_)
        )
    }

    /// `true` for categories that are terminal on first occurrence.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BrokerError::InvalidRequest(_)
                | BrokerError::InsufficientBalance(_)
                | BrokerError::MarketClosed(_)
        )
    }
}
