//! Execution Tracker (C8), per spec.md §4.5 / §3 `ExecutionTracker`.
//! One tracker per live order, created on `ORDER_PLACED` and destroyed on
//! terminal status; owns the order's fill sequence until then (spec.md §3
//! "Ownership").

use chrono::{DateTime, Utc};
use meridian_execution::{order::OrderId, Fill};
use meridian_instrument::Symbol;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionTrackerError {
    #[error("order {order_id} not tracked")]
    NotTracked { order_id: String },
    #[error("fill {fill_id} already applied to order {order_id}")]
    DuplicateFill { order_id: String, fill_id: String },
    #[error(
        "fill of {incoming} on order {order_id} would exceed total quantity {total} \
         (already filled {filled})"
    )]
    ExceedsTotal {
        order_id: String,
        filled: Decimal,
        incoming: Decimal,
        total: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillProgress {
    Partial,
    Complete,
}

#[derive(Debug, Clone)]
pub struct ExecutionTrackerEntry {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub total_quantity: Decimal,
    pub filled_quantity: Decimal,
    pub average_fill_price: Option<Decimal>,
    pub total_commission: Decimal,
    pub fills: Vec<Fill>,
    pub created_at: DateTime<Utc>,
    pub last_fill_at: Option<DateTime<Utc>>,
    seen_fill_ids: HashSet<String>,
}

impl ExecutionTrackerEntry {
    pub fn remaining(&self) -> Decimal {
        self.total_quantity - self.filled_quantity
    }

    pub fn fill_ratio(&self) -> Decimal {
        if self.total_quantity.is_zero() {
            Decimal::ZERO
        } else {
            self.filled_quantity / self.total_quantity
        }
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_partial_fill_time: chrono::TimeDelta) -> bool {
        if self.filled_quantity.is_zero() || self.filled_quantity >= self.total_quantity {
            return false;
        }
        let reference = self.last_fill_at.unwrap_or(self.created_at);
        now - reference > max_partial_fill_time
    }
}

/// Live tracking table, keyed by order id. Entries are inserted on
/// `ORDER_PLACED` and removed when the Order Engine reports a terminal
/// status.
#[derive(Debug, Default)]
pub struct ExecutionTracker {
    entries: RwLock<HashMap<OrderId, ExecutionTrackerEntry>>,
}

impl ExecutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, order_id: OrderId, symbol: Symbol, total_quantity: Decimal, created_at: DateTime<Utc>) {
        self.entries.write().insert(
            order_id.clone(),
            ExecutionTrackerEntry {
                order_id,
                symbol,
                total_quantity,
                filled_quantity: Decimal::ZERO,
                average_fill_price: None,
                total_commission: Decimal::ZERO,
                fills: Vec::new(),
                created_at,
                last_fill_at: None,
                seen_fill_ids: HashSet::new(),
            },
        );
    }

    pub fn untrack(&self, order_id: &OrderId) -> Option<ExecutionTrackerEntry> {
        self.entries.write().remove(order_id)
    }

    pub fn snapshot(&self, order_id: &OrderId) -> Option<ExecutionTrackerEntry> {
        self.entries.read().get(order_id).cloned()
    }

    /// Applies `fill` to its order's tracker. Returns the fill progress so
    /// the caller can publish `ORDER_PARTIALLY_EXECUTED` /
    /// `ORDER_FULLY_EXECUTED`. Idempotent on repeat `fill_id`s (returns
    /// `Ok` with the prior progress, no state change — spec.md §8 testable
    /// property 2).
    pub fn add_fill(&self, fill: Fill) -> Result<FillProgress, ExecutionTrackerError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(&fill.order_id)
            .ok_or_else(|| ExecutionTrackerError::NotTracked {
                order_id: fill.order_id.0.clone(),
            })?;

        if entry.seen_fill_ids.contains(&fill.fill_id) {
            return Ok(if entry.filled_quantity >= entry.total_quantity {
                FillProgress::Complete
            } else {
                FillProgress::Partial
            });
        }

        let new_filled = entry.filled_quantity + fill.quantity;
        if new_filled > entry.total_quantity {
            return Err(ExecutionTrackerError::ExceedsTotal {
                order_id: fill.order_id.0.clone(),
                filled: entry.filled_quantity,
                incoming: fill.quantity,
                total: entry.total_quantity,
            });
        }

        entry.average_fill_price = Some(match entry.average_fill_price {
            None => fill.price,
            Some(avg) => {
                (avg * entry.filled_quantity + fill.price * fill.quantity) / new_filled
            }
        });
        entry.filled_quantity = new_filled;
        entry.total_commission += fill.commission;
        entry.last_fill_at = Some(fill.timestamp);
        entry.seen_fill_ids.insert(fill.fill_id.clone());
        entry.fills.push(fill);

        Ok(if entry.filled_quantity >= entry.total_quantity {
            FillProgress::Complete
        } else {
            FillProgress::Partial
        })
    }

    /// Entries still partially filled and stale per
    /// [`ExecutionTrackerEntry::is_stale`], for the 60s background sweeper.
    pub fn stale_entries(
        &self,
        now: DateTime<Utc>,
        max_partial_fill_time: chrono::TimeDelta,
    ) -> Vec<ExecutionTrackerEntry> {
        self.entries
            .read()
            .values()
            .filter(|e| e.is_stale(now, max_partial_fill_time))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_instrument::Side;
    use rust_decimal_macros::dec;
    use std::collections::HashMap as Map;

    fn fill(order_id: &str, fill_id: &str, qty: Decimal, price: Decimal, at: DateTime<Utc>) -> Fill {
        Fill::new(
            fill_id.to_string(),
            OrderId::new(order_id.into()),
            Symbol::new("005930"),
            Side::Buy,
            qty,
            price,
            Decimal::ZERO,
            at,
            None,
            Map::new(),
        )
    }

    #[test]
    fn partial_then_complete_progress_is_reported() {
        let tracker = ExecutionTracker::new();
        let oid = OrderId::new("o1".into());
        let now = Utc::now();
        tracker.track(oid.clone(), Symbol::new("005930"), dec!(100), now);

        let progress = tracker.add_fill(fill("o1", "f1", dec!(40), dec!(75_000), now)).unwrap();
        assert_eq!(progress, FillProgress::Partial);

        let progress = tracker.add_fill(fill("o1", "f2", dec!(60), dec!(75_100), now)).unwrap();
        assert_eq!(progress, FillProgress::Complete);

        let snapshot = tracker.snapshot(&oid).unwrap();
        assert_eq!(snapshot.filled_quantity, dec!(100));
    }

    #[test]
    fn duplicate_fill_id_is_a_no_op() {
        let tracker = ExecutionTracker::new();
        let oid = OrderId::new("o1".into());
        let now = Utc::now();
        tracker.track(oid.clone(), Symbol::new("005930"), dec!(100), now);
        tracker.add_fill(fill("o1", "f1", dec!(40), dec!(75_000), now)).unwrap();
        tracker.add_fill(fill("o1", "f1", dec!(40), dec!(75_000), now)).unwrap();

        let snapshot = tracker.snapshot(&oid).unwrap();
        assert_eq!(snapshot.filled_quantity, dec!(40));
        assert_eq!(snapshot.fills.len(), 1);
    }

    #[test]
    fn fill_exceeding_total_is_a_hard_error() {
        let tracker = ExecutionTracker::new();
        let oid = OrderId::new("o1".into());
        let now = Utc::now();
        tracker.track(oid, Symbol::new("005930"), dec!(100), now);
        tracker.add_fill(fill("o1", "f1", dec!(100), dec!(75_000), now)).unwrap();

        let err = tracker.add_fill(fill("o1", "f2", dec!(1), dec!(75_000), now));
        assert!(matches!(err, Err(ExecutionTrackerError::ExceedsTotal { .. })));
    }

    #[test]
    fn stale_partial_fill_is_detected_after_timeout() {
        let tracker = ExecutionTracker::new();
        let oid = OrderId::new("o1".into());
        let now = Utc::now();
        tracker.track(oid, Symbol::new("005930"), dec!(100), now);
        tracker.add_fill(fill("o1", "f1", dec!(40), dec!(75_000), now)).unwrap();

        let later = now + chrono::TimeDelta::seconds(700);
        let stale = tracker.stale_entries(later, chrono::TimeDelta::seconds(600));
        assert_eq!(stale.len(), 1);
    }
}
