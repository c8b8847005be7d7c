#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # Execution
//!
//! Order/Fill entity schemas plus the two capability traits the core engine
//! drives out-of-process: [`broker::BrokerAdapter`] (brokerage REST/WebSocket
//! transport, modelled only as a capability per spec.md §1) and
//! [`store::StateStore`] (persistence substrate).
//!
//! Mirrors the teacher `tucano-execution` crate's split between entity
//! types (`order`, `trade`/`balance`) and the exchange-client abstraction
//! (`client::*`), generalised here to a single brokerage-agnostic trait.

pub mod balance;
pub mod broker;
pub mod error;
pub mod fill;
pub mod order;
pub mod store;

pub use balance::AccountBalance;
pub use broker::{BrokerAdapter, MockBrokerAdapter, OrderResult};
pub use error::BrokerError;
pub use fill::Fill;
pub use order::{Order, OrderId};
pub use store::{InMemoryStateStore, StateStore, StoreError};
