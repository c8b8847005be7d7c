//! Financial metrics and the per-strategy Performance Tracker (C9).
//!
//! ```text
//! analytics/
//!  ├─ metric/   # Sharpe Ratio, Win Rate, Profit Factor, max drawdown
//!  ├─ time.rs   # Interval markers metrics are scaled over
//!  ├─ record.rs # SignalRecord / PerformanceMetrics data model
//!  └─ tracker.rs
//! ```

pub mod metric;
pub mod record;
pub mod time;
pub mod tracker;

pub use record::{PerformanceMetrics, SignalRecord};
pub use tracker::{PerformanceTracker, PerformanceTrackerError};
