//! Position Manager (C3), per spec.md §3 `Position` and §4.3 "Position
//! update rules". Each symbol's position is guarded by its own lock
//! (spec.md §5: "Position Manager: one lock per symbol, not a single
//! global lock"), mirroring the teacher's per-instrument state striping in
//! `core/src/engine/state/`.

use chrono::{DateTime, Utc};
use meridian_instrument::Symbol;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Position {
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub market_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub total_commission: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn flat(symbol: Symbol, at: DateTime<Utc>) -> Self {
        Self {
            symbol,
            quantity: Decimal::ZERO,
            average_price: Decimal::ZERO,
            market_price: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            updated_at: at,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.quantity < Decimal::ZERO
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    fn recompute_unrealized(&mut self) {
        self.unrealized_pnl = if self.is_flat() {
            Decimal::ZERO
        } else {
            (self.market_price - self.average_price) * self.quantity
        };
    }

    /// Applies one fill's signed quantity delta, per spec.md §4.3 "Position
    /// update rules": flat→open, same-direction weighted average,
    /// opposite-direction realize-and-possibly-flip.
    pub fn apply_fill(
        &mut self,
        signed_quantity: Decimal,
        fill_price: Decimal,
        fill_commission: Decimal,
        at: DateTime<Utc>,
    ) {
        if self.is_flat() {
            self.quantity = signed_quantity;
            self.average_price = fill_price;
        } else {
            let same_direction = self.quantity.signum() == signed_quantity.signum();
            let qty_abs = signed_quantity.abs();
            if same_direction {
                let current_abs = self.quantity.abs();
                self.average_price = (current_abs * self.average_price + qty_abs * fill_price)
                    / (current_abs + qty_abs);
                self.quantity += signed_quantity;
            } else {
                let close = self.quantity.abs().min(qty_abs);
                self.realized_pnl +=
                    (fill_price - self.average_price) * close * self.quantity.signum();
                let previous_sign = self.quantity.signum();
                self.quantity += signed_quantity;
                if !self.quantity.is_zero() && self.quantity.signum() != previous_sign {
                    self.average_price = fill_price;
                }
            }
        }

        self.total_commission += fill_commission;
        self.updated_at = at;
        self.recompute_unrealized();
    }

    pub fn mark_to_market(&mut self, market_price: Decimal, at: DateTime<Utc>) {
        self.market_price = market_price;
        self.updated_at = at;
        self.recompute_unrealized();
    }
}

/// One lock per symbol, not a single global lock over the whole book.
#[derive(Debug, Default)]
pub struct PositionManager {
    positions: parking_lot::RwLock<HashMap<Symbol, Arc<Mutex<Position>>>>,
    enable_short_selling: bool,
    position_size_limit: Decimal,
}

impl PositionManager {
    pub fn new(enable_short_selling: bool, position_size_limit: Decimal) -> Self {
        Self {
            positions: parking_lot::RwLock::new(HashMap::new()),
            enable_short_selling,
            position_size_limit,
        }
    }

    fn slot(&self, symbol: &Symbol) -> Arc<Mutex<Position>> {
        if let Some(slot) = self.positions.read().get(symbol) {
            return Arc::clone(slot);
        }
        Arc::clone(
            self.positions
                .write()
                .entry(symbol.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Position::flat(symbol.clone(), Utc::now())))),
        )
    }

    pub fn snapshot(&self, symbol: &Symbol) -> Option<Position> {
        self.positions.read().get(symbol).map(|p| p.lock().clone())
    }

    pub fn all_snapshots(&self) -> Vec<Position> {
        self.positions
            .read()
            .values()
            .map(|p| p.lock().clone())
            .collect()
    }

    /// `true` if opening `symbol` (if currently untracked) would keep the
    /// count of non-flat positions at or below `max_position_count`.
    pub fn can_open(&self, symbol: &Symbol, max_position_count: usize) -> bool {
        let already_tracked = self
            .positions
            .read()
            .get(symbol)
            .map(|p| !p.lock().is_flat())
            .unwrap_or(false);
        if already_tracked {
            return true;
        }
        let open_count = self
            .positions
            .read()
            .values()
            .filter(|p| !p.lock().is_flat())
            .count();
        open_count < max_position_count
    }

    pub fn allows_short(&self) -> bool {
        self.enable_short_selling
    }

    pub fn size_limit(&self) -> Decimal {
        self.position_size_limit
    }

    pub fn apply_fill(
        &self,
        symbol: &Symbol,
        signed_quantity: Decimal,
        fill_price: Decimal,
        fill_commission: Decimal,
        at: DateTime<Utc>,
    ) -> Position {
        let slot = self.slot(symbol);
        let mut position = slot.lock();
        position.apply_fill(signed_quantity, fill_price, fill_commission, at);
        position.clone()
    }

    pub fn mark_to_market(&self, symbol: &Symbol, market_price: Decimal, at: DateTime<Utc>) -> Position {
        let slot = self.slot(symbol);
        let mut position = slot.lock();
        position.mark_to_market(market_price, at);
        position.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn t() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn flat_to_open_sets_quantity_and_average() {
        let mut pos = Position::flat(Symbol::new("005930"), t());
        pos.apply_fill(dec!(100), dec!(75_000), dec!(10), t());
        assert_eq!(pos.quantity, dec!(100));
        assert_eq!(pos.average_price, dec!(75_000));
    }

    #[test]
    fn same_direction_fill_uses_weighted_average() {
        let mut pos = Position::flat(Symbol::new("005930"), t());
        pos.apply_fill(dec!(100), dec!(75_000), dec!(0), t());
        pos.apply_fill(dec!(100), dec!(76_000), dec!(0), t());
        assert_eq!(pos.quantity, dec!(200));
        assert_eq!(pos.average_price, dec!(75_500));
    }

    #[test]
    fn opposite_direction_realizes_and_flips_average() {
        // S6 from spec.md §8: long 100@75_000, sell 150 at 76_000.
        let mut pos = Position::flat(Symbol::new("005930"), t());
        pos.apply_fill(dec!(100), dec!(75_000), dec!(0), t());
        pos.apply_fill(dec!(-150), dec!(76_000), dec!(0), t());

        assert_eq!(pos.quantity, dec!(-50));
        assert_eq!(pos.realized_pnl, dec!(100_000)); // (76000-75000)*100
        assert_eq!(pos.average_price, dec!(76_000));
    }

    #[test]
    fn partial_close_keeps_average_price() {
        let mut pos = Position::flat(Symbol::new("005930"), t());
        pos.apply_fill(dec!(100), dec!(75_000), dec!(0), t());
        pos.apply_fill(dec!(-40), dec!(76_000), dec!(0), t());

        assert_eq!(pos.quantity, dec!(60));
        assert_eq!(pos.average_price, dec!(75_000));
        assert_eq!(pos.realized_pnl, dec!(40_000));
    }

    #[test]
    fn mark_to_market_updates_unrealized_pnl() {
        let mut pos = Position::flat(Symbol::new("005930"), t());
        pos.apply_fill(dec!(100), dec!(75_000), dec!(0), t());
        pos.mark_to_market(dec!(75_500), t());
        assert_eq!(pos.unrealized_pnl, dec!(50_000));
    }

    #[test]
    fn position_manager_enforces_max_position_count() {
        let manager = PositionManager::new(true, dec!(1_000_000_000));
        manager.apply_fill(&Symbol::new("005930"), dec!(10), dec!(75_000), dec!(0), t());
        assert!(!manager.can_open(&Symbol::new("000660"), 1));
        assert!(manager.can_open(&Symbol::new("005930"), 1));
    }
}
