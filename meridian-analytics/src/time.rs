//! Time interval definitions used to annotate interval-scaled metrics.
//!
//! Grounded on the usage in
//! `examples/brbtavares-tucano/analytics/src/metric/sharpe.rs`
//! (`SharpeRatio<Interval>` is generic over a `TimeInterval`), whose own
//! `time` module was absent from the snapshot under examination; the trait
//! and its two marker implementations are reconstructed here from that
//! file's usage.

use chrono::TimeDelta;

/// A span of time a metric's value is expressed over.
pub trait TimeInterval {
    fn interval(&self) -> TimeDelta;
}

impl TimeInterval for TimeDelta {
    fn interval(&self) -> TimeDelta {
        *self
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Daily;

impl TimeInterval for Daily {
    fn interval(&self) -> TimeDelta {
        TimeDelta::days(1)
    }
}

/// 252 trading days, the convention used by
/// `examples/original_source/qb/engines/strategy_engine/performance.py`'s
/// `trading_days_per_year`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Annual252;

impl TimeInterval for Annual252 {
    fn interval(&self) -> TimeDelta {
        TimeDelta::days(252)
    }
}
