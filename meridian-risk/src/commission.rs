//! Commission Calculator (C2), per spec.md §4.6.
//!
//! Grounded on `examples/original_source/qb/engines/order_engine/commission_calculator.py`
//! (`KoreanStockCommissionCalculator`): one schedule selected at
//! construction, per spec.md §9's open question about the two divergent
//! schedules in source.

use meridian_execution::Order;
use meridian_instrument::{Side, Symbol};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Discount flags read from an order's metadata, per spec.md §4.6 "Apply
/// discount multiplier from metadata flags (vip / online / frequent)".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscountFlags {
    pub vip: bool,
    pub online: bool,
    pub frequent: bool,
}

impl DiscountFlags {
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Self {
        let is_set = |key: &str| metadata.get(key).map(|v| v == "true").unwrap_or(false);
        Self {
            vip: is_set("vip_customer"),
            online: is_set("online_order"),
            frequent: is_set("frequent_trader"),
        }
    }
}

/// A fixed commission schedule, the Korean-equities rates from
/// `commission_calculator.py` by default.
#[derive(Debug, Clone, PartialEq)]
pub struct CommissionSchedule {
    pub brokerage_rate: Decimal,
    pub min_brokerage_fee: Decimal,
    pub exchange_fee_rate: Decimal,
    pub clearing_fee_rate: Decimal,
    pub transaction_tax_rate: Decimal,
    pub rural_tax_rate: Decimal,
    pub vip_discount: Decimal,
    pub online_discount: Decimal,
    pub frequent_trader_discount: Decimal,
    pub max_discount: Decimal,
    /// Per-symbol overrides of `brokerage_rate` (ETFs, special listings).
    pub special_rates: HashMap<Symbol, Decimal>,
    /// Minimum currency unit to round to (e.g. `1` won, `0.01` for cents).
    pub minimum_currency_unit: Decimal,
}

impl Default for CommissionSchedule {
    fn default() -> Self {
        Self {
            brokerage_rate: Decimal::new(15, 5),          // 0.015%
            min_brokerage_fee: Decimal::new(100, 0),       // 100 won
            exchange_fee_rate: Decimal::new(8, 6),         // 0.0008%
            clearing_fee_rate: Decimal::new(154, 7),       // 0.00154%
            transaction_tax_rate: Decimal::new(23, 4),     // 0.23%
            rural_tax_rate: Decimal::new(2, 1),            // 20% of the transaction tax
            vip_discount: Decimal::new(5, 1),              // 50%
            online_discount: Decimal::new(2, 1),            // 20%
            frequent_trader_discount: Decimal::new(1, 1),   // 10%
            max_discount: Decimal::new(8, 1),               // 80% cap
            special_rates: HashMap::new(),
            minimum_currency_unit: Decimal::ONE,
        }
    }
}

/// Itemised commission result, per spec.md §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    pub trade_amount: Decimal,
    pub brokerage_fee: Decimal,
    pub exchange_fee: Decimal,
    pub clearing_fee: Decimal,
    pub transaction_tax: Decimal,
    pub rural_tax: Decimal,
    pub discount_rate: Decimal,
    pub total: Decimal,
}

impl CommissionSchedule {
    /// Pure function `(order, fill_price, fill_quantity) → fee breakdown`.
    pub fn calculate(
        &self,
        order: &Order,
        fill_price: Decimal,
        fill_quantity: Decimal,
    ) -> CommissionBreakdown {
        let trade_amount = fill_price * fill_quantity;

        let brokerage_rate = self
            .special_rates
            .get(&order.symbol)
            .copied()
            .unwrap_or(self.brokerage_rate);
        let brokerage_fee = (trade_amount * brokerage_rate).max(self.min_brokerage_fee);
        let exchange_fee = trade_amount * self.exchange_fee_rate;
        let clearing_fee = trade_amount * self.clearing_fee_rate;

        let (transaction_tax, rural_tax) = if order.side == Side::Sell {
            let transaction_tax = trade_amount * self.transaction_tax_rate;
            let rural_tax = transaction_tax * self.rural_tax_rate;
            (transaction_tax, rural_tax)
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };

        let subtotal = brokerage_fee + exchange_fee + clearing_fee + transaction_tax + rural_tax;

        let flags = DiscountFlags::from_metadata(&order.metadata);
        let mut discount_rate = Decimal::ZERO;
        if flags.vip {
            discount_rate += self.vip_discount;
        }
        if flags.online {
            discount_rate += self.online_discount;
        }
        if flags.frequent {
            discount_rate += self.frequent_trader_discount;
        }
        discount_rate = discount_rate.min(self.max_discount);

        let discounted = subtotal * (Decimal::ONE - discount_rate);
        let total = round_to_unit(discounted, self.minimum_currency_unit);

        CommissionBreakdown {
            trade_amount,
            brokerage_fee,
            exchange_fee,
            clearing_fee,
            transaction_tax,
            rural_tax,
            discount_rate,
            total,
        }
    }
}

/// Half-up rounding to the configured minimum currency unit. `Decimal`'s
/// `MidpointAwayFromZero` strategy is "banker-free" half-up as required by
/// spec.md §4.6 (as opposed to the default banker's-rounding `round()`).
fn round_to_unit(amount: Decimal, unit: Decimal) -> Decimal {
    if unit.is_zero() {
        return amount;
    }
    (amount / unit).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_execution::order::OrderId;
    use meridian_instrument::{OrderType, TimeInForce};
    use rust_decimal_macros::dec;

    fn order(side: Side) -> Order {
        Order::new(
            OrderId::new("o1".into()),
            Symbol::new("005930"),
            side,
            OrderType::Limit,
            dec!(100),
            Some(dec!(75_000)),
            None,
            TimeInForce::Day,
            None,
            Utc::now(),
            HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn sell_commission_exceeds_buy_by_at_least_the_tax_floor() {
        // S4 from spec.md §8: schedule with discounts disabled.
        let schedule = CommissionSchedule {
            vip_discount: Decimal::ZERO,
            online_discount: Decimal::ZERO,
            frequent_trader_discount: Decimal::ZERO,
            ..CommissionSchedule::default()
        };

        let buy = schedule.calculate(&order(Side::Buy), dec!(75_000), dec!(100));
        let sell = schedule.calculate(&order(Side::Sell), dec!(75_000), dec!(100));

        assert!(sell.total > buy.total);

        let trade_amount = dec!(75_000) * dec!(100);
        let min_gap = trade_amount
            * (schedule.transaction_tax_rate
                + schedule.transaction_tax_rate * schedule.rural_tax_rate)
            * (Decimal::ONE - Decimal::ZERO);
        assert!(sell.total - buy.total >= min_gap - dec!(1));
    }

    #[test]
    fn discount_is_capped_at_max() {
        let schedule = CommissionSchedule::default();
        let mut metadata = HashMap::new();
        metadata.insert("vip_customer".into(), "true".into());
        metadata.insert("online_order".into(), "true".into());
        metadata.insert("frequent_trader".into(), "true".into());

        let mut buy_order = order(Side::Buy);
        buy_order.metadata = metadata;

        let breakdown = schedule.calculate(&buy_order, dec!(75_000), dec!(100));
        assert_eq!(breakdown.discount_rate, schedule.max_discount);
    }

    #[test]
    fn buy_only_pays_brokerage_exchange_and_clearing_fees() {
        let schedule = CommissionSchedule {
            vip_discount: Decimal::ZERO,
            online_discount: Decimal::ZERO,
            frequent_trader_discount: Decimal::ZERO,
            ..CommissionSchedule::default()
        };
        let breakdown = schedule.calculate(&order(Side::Buy), dec!(75_000), dec!(100));
        assert_eq!(breakdown.transaction_tax, Decimal::ZERO);
        assert_eq!(breakdown.rural_tax, Decimal::ZERO);
        assert_eq!(
            breakdown.total,
            round_to_unit(
                breakdown.brokerage_fee + breakdown.exchange_fee + breakdown.clearing_fee,
                schedule.minimum_currency_unit
            )
        );
    }
}
