//! `Fill` entity, per spec.md §3 `Fill`.

use crate::order::OrderId;
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use meridian_instrument::{Side, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single broker-confirmed execution of part or all of an order.
///
/// Identified by [`fill_id`](Fill::fill_id); applying the same `fill_id`
/// twice to an [`crate::store::StateStore`]-backed tracker must be a no-op
/// (spec.md §3, testable property 2).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Fill {
    pub fill_id: String,
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub commission: Decimal,
    pub timestamp: DateTime<Utc>,
    pub broker_fill_id: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl Fill {
    pub fn trade_amount(&self) -> Decimal {
        self.price * self.quantity
    }
}
