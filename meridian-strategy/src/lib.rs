#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Strategy
//!
//! The plug-in contract (spec.md §4.2), its build-time registry (C5), and
//! the moving-average momentum reference strategy.
//!
//! Mirrors the teacher's split between `tucano-trader` (abstractions:
//! `AlgoStrategy`, `ClosePositionsStrategy`, ...) and `tucano-strategies`
//! (concrete implementations, e.g. `OrderBookImbalanceStrategy`). Per
//! spec.md §9's redesign note, the duck-typed plug-in base class becomes a
//! capability trait ([`Strategy`]) instantiated through a registration
//! table ([`registry::StrategyRegistry`]) rather than reflection-based
//! dynamic loading; hot reload is out of scope for a compiled target.

pub mod market_data;
pub mod moving_average;
pub mod parameter;
pub mod registry;
pub mod signal;
pub mod strategy;

pub use market_data::MarketData;
pub use moving_average::{MovingAverageMomentum, MovingAverageParams};
pub use parameter::{ParamType, ParamValue, ParameterSpec};
pub use registry::{StrategyHandle, StrategyLoader, StrategyLoaderError};
pub use signal::{SignalAction, TradingSignal};
pub use strategy::{Strategy, StrategyError, StrategyState};
