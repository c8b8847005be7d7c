//! Event Bus (C1), per spec.md §4.1.

pub mod bus;
pub mod circuit_breaker;
pub mod filter;
pub mod types;

pub use bus::{DeadLetter, EventBus, EventBusConfig, EventBusMetricsSnapshot, EventHandler, FnHandler};
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use filter::EventFilter;
pub use types::{
    AlertPayload, BrokerFillNotice, ErrorPayload, Event, EventPayload, EventType,
    OrderPlacedPayload, OrderProgressPayload, OrderTerminalPayload, PositionUpdatedPayload,
    StatusPayload,
};
