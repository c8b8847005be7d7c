//! Financial metrics used by the Performance Tracker, expressed over
//! [`TimeInterval`](crate::time::TimeInterval)s where interval-scaling
//! matters.

pub mod drawdown;
pub mod profit_factor;
pub mod sharpe;
pub mod win_rate;
