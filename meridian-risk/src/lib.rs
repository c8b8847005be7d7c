#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Risk
//!
//! The Commission Calculator (C2) and the `RiskApproved`/`RiskRefused`
//! result shape used by the Order Engine's pre-trade validation (C7).
//!
//! The *ancillary risk engine* (limit checks beyond pre-trade validation) is
//! out of scope per spec.md §1 — modelled only as an event subscriber
//! elsewhere in the system. This crate mirrors the teacher `tucano-risk`
//! crate's `RiskApproved`/`RiskRefused` wrapper shape, generalised to the
//! order-level pre-trade checks spec.md §4.3 actually requires in-core.

pub mod commission;
pub mod pretrade;

pub use commission::{CommissionBreakdown, CommissionSchedule};
pub use pretrade::{PreTradeCheck, RiskApproved, RiskRefused};
