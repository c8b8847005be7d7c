#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! Shared, behaviour-free value types used across the Meridian trading
//! engine crates: ticker symbols, trade side, order taxonomy and event
//! priority. Kept dependency-light so every other crate can sit on top of
//! it without pulling in async runtimes or decimal arithmetic.

pub mod interval;
pub mod order_kind;
pub mod priority;
pub mod side;
pub mod symbol;

pub use interval::IntervalType;
pub use order_kind::{OrderStatus, OrderType, TimeInForce};
pub use priority::EventPriority;
pub use side::Side;
pub use symbol::Symbol;
