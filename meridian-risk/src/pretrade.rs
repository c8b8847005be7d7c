//! Pre-trade validation result shapes, per spec.md §4.3 "Pre-trade
//! validation". Mirrors the teacher `tucano-risk` crate's
//! `RiskApproved`/`RiskRefused` wrapper pattern, reused here for the four
//! checks the Order Engine runs in-core (the ancillary risk engine proper
//! is an external collaborator, per spec.md §1).

use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

/// An item (typically an `Order`) that passed every pre-trade check.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Display, Constructor)]
pub struct RiskApproved<T>(pub T);

impl<T> RiskApproved<T> {
    pub fn into_item(self) -> T {
        self.0
    }
}

/// An item rejected by a pre-trade check, carrying the reason.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RiskRefused<T, Reason = PreTradeCheck> {
    pub item: T,
    pub reason: Reason,
}

impl<T, Reason> RiskRefused<T, Reason> {
    pub fn new(item: T, reason: Reason) -> Self {
        Self { item, reason }
    }

    pub fn into_item(self) -> T {
        self.item
    }
}

/// The four pre-trade checks from spec.md §4.3, in validation order. The
/// first failing check produces the rejection (spec.md: "all must pass;
/// first failure → rejection").
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Display)]
pub enum PreTradeCheck {
    #[display("quantity must be positive")]
    NonPositiveQuantity,
    #[display("order value exceeds max_order_value")]
    ExceedsMaxOrderValue,
    #[display("opening this symbol would exceed max_position_count")]
    ExceedsMaxPositionCount,
    #[display("order would exceed available_cash")]
    InsufficientCash,
}
