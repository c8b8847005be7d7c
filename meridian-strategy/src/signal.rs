//! `TradingSignal` entity, per spec.md §3.

use chrono::{DateTime, Utc};
use meridian_instrument::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

/// A strategy's output for a single `analyze` invocation. Invariants:
/// `confidence ∈ [0.0, 1.0]` (enforced at construction).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradingSignal {
    pub action: SignalAction,
    pub symbol: Symbol,
    pub confidence: f64,
    pub price: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub reason: Option<String>,
    pub metadata: HashMap<String, String>,
    pub timestamp: DateTime<Utc>,
    pub strategy_name: String,
}

impl TradingSignal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        action: SignalAction,
        symbol: Symbol,
        confidence: f64,
        price: Option<Decimal>,
        quantity: Option<Decimal>,
        reason: Option<String>,
        metadata: HashMap<String, String>,
        timestamp: DateTime<Utc>,
        strategy_name: impl Into<String>,
    ) -> Self {
        Self {
            action,
            symbol,
            confidence: confidence.clamp(0.0, 1.0),
            price,
            quantity,
            reason,
            metadata,
            timestamp,
            strategy_name: strategy_name.into(),
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.action != SignalAction::Hold
    }
}
