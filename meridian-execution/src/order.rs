//! `Order` entity and its invariants, per spec.md §3 `Order`.

use crate::error::OrderError;
use chrono::{DateTime, Utc};
use derive_more::{Constructor, Display, From};
use meridian_instrument::{OrderStatus, OrderType, Side, Symbol, TimeInForce};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Globally unique order identifier.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Display, From, Constructor,
)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Order {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub strategy_name: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub filled_quantity: Decimal,
    pub average_fill_price: Option<Decimal>,
    pub commission: Decimal,
    pub metadata: HashMap<String, String>,
}

impl Order {
    /// Constructs a new `Order` in [`OrderStatus::Pending`], validating the
    /// schema-level invariants from spec.md §3: `quantity > 0`, `price`
    /// required for LIMIT/STOP_LIMIT, `stop_price` required for
    /// STOP/STOP_LIMIT.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: OrderId,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        quantity: Decimal,
        price: Option<Decimal>,
        stop_price: Option<Decimal>,
        time_in_force: TimeInForce,
        strategy_name: Option<String>,
        now: DateTime<Utc>,
        metadata: HashMap<String, String>,
    ) -> Result<Self, OrderError> {
        if quantity <= Decimal::ZERO {
            return Err(OrderError::NonPositiveQuantity(quantity));
        }
        if order_type.requires_price() && price.is_none() {
            return Err(OrderError::MissingPrice(order_type));
        }
        if order_type.requires_stop_price() && stop_price.is_none() {
            return Err(OrderError::MissingStopPrice(order_type));
        }

        Ok(Self {
            order_id,
            symbol,
            side,
            order_type,
            quantity,
            price,
            stop_price,
            time_in_force,
            strategy_name,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
            filled_quantity: Decimal::ZERO,
            average_fill_price: None,
            commission: Decimal::ZERO,
            metadata,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn remaining_quantity(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    /// Applies a single fill's weighted-average contribution to this order.
    /// Invariant 5: `average_fill_price = Σ(fᵢ.price·fᵢ.qty) / Σ fᵢ.qty`.
    ///
    /// # Errors
    /// Returns [`OrderError::FillExceedsQuantity`] if `fill_quantity` would
    /// push `filled_quantity` past `quantity` (invariant 1).
    pub fn apply_fill(
        &mut self,
        fill_quantity: Decimal,
        fill_price: Decimal,
        fill_commission: Decimal,
        time: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if fill_quantity <= Decimal::ZERO {
            return Err(OrderError::NonPositiveQuantity(fill_quantity));
        }
        let new_filled = self.filled_quantity + fill_quantity;
        if new_filled > self.quantity {
            return Err(OrderError::FillExceedsQuantity {
                order_id: self.order_id.clone(),
                filled: self.filled_quantity,
                incoming: fill_quantity,
                total: self.quantity,
            });
        }

        self.average_fill_price = Some(match self.average_fill_price {
            None => fill_price,
            Some(avg) => {
                let total_value = avg * self.filled_quantity + fill_price * fill_quantity;
                total_value / new_filled
            }
        });
        self.filled_quantity = new_filled;
        self.commission += fill_commission;
        self.updated_at = time;

        self.status = if self.filled_quantity == self.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartialFilled
        };

        Ok(())
    }

    pub fn transition(&mut self, status: OrderStatus, time: DateTime<Utc>) {
        self.status = status;
        self.updated_at = time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_instrument::Symbol;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-07-26T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn new_order(quantity: Decimal) -> Order {
        Order::new(
            OrderId::new("o1".into()),
            Symbol::new("005930"),
            Side::Buy,
            OrderType::Limit,
            quantity,
            Some(dec!(75_000)),
            None,
            TimeInForce::Day,
            Some("momentum".into()),
            now(),
            HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn limit_without_price_is_rejected() {
        let result = Order::new(
            OrderId::new("o1".into()),
            Symbol::new("005930"),
            Side::Buy,
            OrderType::Limit,
            dec!(10),
            None,
            None,
            TimeInForce::Day,
            None,
            now(),
            HashMap::new(),
        );
        assert!(matches!(result, Err(OrderError::MissingPrice(_))));
    }

    #[test]
    fn partial_then_full_fill_matches_weighted_average() {
        // S3 from spec.md §8.
        let mut order = new_order(dec!(1000));
        order.apply_fill(dec!(300), dec!(74_950), Decimal::ZERO, now()).unwrap();
        assert_eq!(order.status, OrderStatus::PartialFilled);
        assert_eq!(order.filled_quantity, dec!(300));
        assert_eq!(order.average_fill_price, Some(dec!(74_950)));

        order.apply_fill(dec!(700), dec!(75_000), Decimal::ZERO, now()).unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_quantity, dec!(1000));
        assert_eq!(order.average_fill_price, Some(dec!(74_985)));
    }

    #[test]
    fn fill_exceeding_quantity_is_rejected() {
        let mut order = new_order(dec!(100));
        order.apply_fill(dec!(100), dec!(75_000), Decimal::ZERO, now()).unwrap();
        let err = order.apply_fill(dec!(1), dec!(75_000), Decimal::ZERO, now());
        assert!(matches!(err, Err(OrderError::FillExceedsQuantity { .. })));
    }
}
