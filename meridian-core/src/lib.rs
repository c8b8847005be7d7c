#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # Core
//!
//! The engine's component wiring: Event Bus (C1), Position Manager (C3),
//! Order Queue (C4), Strategy Engine (C6), Order Engine (C7), and
//! Execution Tracker (C8), composed by [`engine::Engine`]. Commission
//! Calculator (C2) lives in `meridian-risk`, Strategy Loader (C5) in
//! `meridian-strategy`, Performance Tracker (C9) in `meridian-analytics`.
//!
//! Mirrors the teacher's `core` crate's role as the workspace's
//! composition root: configuration, the event bus, shutdown signalling,
//! and structured logging all live here, the same way `tucano-core` hosts
//! `system`, `shutdown`, and `logging` alongside the execution engine.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod execution_tracker;
pub mod logging;
pub mod market_source;
pub mod order_engine;
pub mod position;
pub mod queue;
pub mod shutdown;
pub mod strategy_engine;

pub use config::{
    EngineConfig, ExecutionMonitorConfig, OrderEngineConfig, OrderQueueConfig,
    PositionManagerConfig,
};
pub use engine::Engine;
pub use error::{EngineError, RxDropped};
pub use event::{
    AlertPayload, BrokerFillNotice, CircuitBreaker, CircuitState, DeadLetter, ErrorPayload, Event,
    EventBus, EventBusConfig, EventBusMetricsSnapshot, EventFilter, EventHandler, EventPayload,
    EventType, FnHandler, OrderPlacedPayload, OrderProgressPayload, OrderTerminalPayload,
    PositionUpdatedPayload, StatusPayload,
};
pub use execution_tracker::{
    ExecutionTracker, ExecutionTrackerEntry, ExecutionTrackerError, FillProgress,
};
pub use market_source::{MarketDataSource, ScriptedMarketDataSource};
pub use order_engine::{OrderEngine, OrderEngineFillHandler, OrderEngineSignalHandler};
pub use position::{Position, PositionManager};
pub use queue::{compute_priority, OrderQueue, QueueError, QueueStatus};
pub use shutdown::{AsyncShutdown, Shutdown, SyncShutdown};
pub use strategy_engine::{StrategyEngine, StrategyEngineHandler};
