//! `MarketData` entity, per spec.md §3.

use chrono::{DateTime, Utc};
use meridian_instrument::{IntervalType, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single OHLCV bar plus whatever indicators the Strategy Engine (C6)
/// resolved for it before dispatch (spec.md §4.2 step 2) — including, by
/// this implementation's convention, the synthetic `position_quantity` /
/// `position_average_price` keys `meridian_core::StrategyEngine` injects
/// from the Position Manager so strategies can express "position held"
/// rules (see `DESIGN.md`, "Strategy position awareness").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MarketData {
    pub symbol: Symbol,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub interval_type: IntervalType,
    pub indicators: HashMap<String, Decimal>,
}

impl MarketData {
    pub fn indicator(&self, name: &str) -> Option<Decimal> {
        self.indicators.get(name).copied()
    }

    /// Position-awareness convention described above: `> 0` positive
    /// indicates a held long position, `< 0` a short, `0`/absent flat.
    pub fn position_quantity(&self) -> Decimal {
        self.indicator("position_quantity").unwrap_or(Decimal::ZERO)
    }

    pub fn position_held(&self) -> bool {
        !self.position_quantity().is_zero()
    }
}
