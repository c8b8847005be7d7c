#![forbid(unsafe_code)]

//! "meridian" facade crate
//!
//! A single entry point that re-exports every crate in the Meridian
//! algorithmic trading engine under an organised namespace, for users who
//! prefer to depend on one crate instead of six.
//!
//! ```rust,no_run
//! use meridian::core; // access modules via re-export
//! use meridian::instrument::Side;
//! let _side: Side = Side::Buy;
//! // Engine available at meridian::core::engine, construction requires
//! // concrete BrokerAdapter/StateStore/StrategyLoader instances.
//! ```

pub use meridian_analytics as analytics;
pub use meridian_core as core;
pub use meridian_execution as execution;
pub use meridian_instrument as instrument;
pub use meridian_risk as risk;
pub use meridian_strategy as strategy;

// Flat re-export of the symbols most callers reach for first.
pub use meridian_core::{engine::Engine, EngineConfig, EngineError};
pub use meridian_instrument::{Side, Symbol};

/// Single-import convenience for wiring a full engine instance.
pub mod prelude {
    pub use crate::core::{engine::Engine, EngineConfig, EngineError, Event, EventPayload, EventType};
    pub use crate::execution::{BrokerAdapter, Order, StateStore};
    pub use crate::instrument::{Side, Symbol};
    pub use crate::strategy::{Strategy, StrategyLoader, TradingSignal};
}
