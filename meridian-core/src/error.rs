//! Central error type for the engine crate, aggregating errors from every
//! subsystem it drives. Grounded on the teacher's `core/src/error.rs`
//! `ToucanError` (`#[from]` conversions, `RxDropped`, `JoinError` wrapping
//! `tokio::task::JoinError`).

use crate::execution_tracker::ExecutionTrackerError;
use meridian_analytics::PerformanceTrackerError;
use meridian_execution::{error::OrderError, BrokerError, StoreError};
use meridian_strategy::{StrategyError, StrategyLoaderError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("strategy loader error: {0}")]
    StrategyLoader(#[from] StrategyLoaderError),

    #[error("performance tracker error: {0}")]
    PerformanceTracker(#[from] PerformanceTrackerError),

    #[error("execution tracker error: {0}")]
    ExecutionTracker(#[from] ExecutionTrackerError),

    #[error("queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("order {order_id} not found")]
    OrderNotFound { order_id: String },

    #[error("pre-trade check rejected order: {0}")]
    RiskRejected(String),

    #[error(transparent)]
    RxDropped(#[from] RxDropped),

    #[error("task join error: {0}")]
    JoinError(String),
}

/// Marker for a dropped channel receiver, per the teacher's `RxDropped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("receiver dropped")]
pub struct RxDropped;

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RxDropped {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for EngineError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::RxDropped(RxDropped)
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::JoinError(format!("{value:?}"))
    }
}
