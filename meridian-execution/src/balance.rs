//! Account balance snapshot returned by [`crate::broker::BrokerAdapter::get_account_balance`].

use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Mirrors spec.md §6.1: "a mapping with at least `{available_cash,
/// total_assets}`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct AccountBalance {
    pub available_cash: Decimal,
    pub total_assets: Decimal,
}
