//! [`SignalRecord`] and [`PerformanceMetrics`], the data model of the
//! Performance Tracker (C9), per spec.md §4.7 and grounded on
//! `examples/original_source/qb/engines/strategy_engine/performance.py`'s
//! `SignalRecord`/`PerformanceMetrics` dataclasses.

use crate::metric::{drawdown::MaxDrawdown, profit_factor::ProfitFactor, sharpe::SharpeRatio, win_rate::WinRate};
use chrono::{DateTime, TimeDelta, Utc};
use derive_more::Constructor;
use meridian_instrument::Symbol;
use meridian_strategy::SignalAction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One strategy signal, tracked from emission through fill and, if it opens
/// a position, through to close.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct SignalRecord {
    pub signal_id: String,
    pub strategy_name: String,
    pub symbol: Symbol,
    pub action: SignalAction,
    pub confidence: f64,
    pub price: Decimal,
    pub quantity: Decimal,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub metadata: HashMap<String, String>,

    pub executed: bool,
    pub execution_price: Option<Decimal>,
    pub execution_time: Option<DateTime<Utc>>,

    pub current_price: Option<Decimal>,
    pub pnl: Option<Decimal>,
    pub closed: bool,
    pub close_price: Option<Decimal>,
    pub close_time: Option<DateTime<Utc>>,
}

impl SignalRecord {
    /// Builds the unopened record for a just-emitted signal, per the
    /// original tracker's `record_signal`.
    pub fn from_signal(
        strategy_name: impl Into<String>,
        signal: &meridian_strategy::TradingSignal,
    ) -> Self {
        let strategy_name = strategy_name.into();
        let signal_id = format!(
            "{strategy_name}_{}_{}",
            signal.symbol,
            signal.timestamp.format("%Y%m%d_%H%M%S")
        );
        Self {
            signal_id,
            strategy_name,
            symbol: signal.symbol.clone(),
            action: signal.action,
            confidence: signal.confidence,
            price: signal.price.unwrap_or(Decimal::ZERO),
            quantity: signal.quantity.unwrap_or(Decimal::ZERO),
            timestamp: signal.timestamp,
            reason: signal.reason.clone().unwrap_or_default(),
            metadata: signal.metadata.clone(),
            executed: false,
            execution_price: None,
            execution_time: None,
            current_price: None,
            pnl: None,
            closed: false,
            close_price: None,
            close_time: None,
        }
    }

    fn directional_pnl(&self, reference_price: Decimal) -> Decimal {
        match self.action {
            SignalAction::Buy => (reference_price - self.execution_price.unwrap_or(Decimal::ZERO))
                * self.quantity,
            SignalAction::Sell => {
                (self.execution_price.unwrap_or(Decimal::ZERO) - reference_price) * self.quantity
            }
            SignalAction::Hold => Decimal::ZERO,
        }
    }

    pub fn mark_executed(&mut self, execution_price: Decimal, execution_time: DateTime<Utc>) {
        self.executed = true;
        self.execution_price = Some(execution_price);
        self.execution_time = Some(execution_time);
    }

    /// Mark-to-market update for an open position; no-op if not executed or
    /// already closed.
    pub fn mark_to_market(&mut self, current_price: Decimal) -> bool {
        if !self.executed || self.closed {
            return false;
        }
        self.current_price = Some(current_price);
        self.pnl = Some(self.directional_pnl(current_price));
        true
    }

    pub fn close(&mut self, close_price: Decimal, close_time: DateTime<Utc>) -> bool {
        if !self.executed || self.closed {
            return false;
        }
        self.closed = true;
        self.close_price = Some(close_price);
        self.close_time = Some(close_time);
        self.pnl = Some(self.directional_pnl(close_price));
        true
    }

    pub fn hold_time(&self) -> Option<TimeDelta> {
        match (self.execution_time, self.close_time) {
            (Some(open), Some(close)) => Some(close - open),
            _ => None,
        }
    }
}

/// Aggregate performance snapshot for one strategy, recomputed in full
/// after every position close (see
/// `crate::tracker::PerformanceTracker::recalculate`).
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct PerformanceMetrics {
    pub strategy_name: String,
    pub total_signals: u64,
    pub buy_signals: u64,
    pub sell_signals: u64,
    pub hold_signals: u64,

    pub total_return: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,

    pub winning_trades: u64,
    pub losing_trades: u64,
    pub win_rate: Option<WinRate>,
    pub profit_factor: Option<ProfitFactor>,

    pub max_drawdown: Option<MaxDrawdown>,
    pub sharpe_ratio: Option<SharpeRatio<TimeDelta>>,
    pub volatility: Decimal,

    pub avg_hold_time: Option<TimeDelta>,
    pub current_streak: i64,
    pub best_streak: u64,
    pub worst_streak: u64,
    pub best_trade: Option<Decimal>,
    pub worst_trade: Option<Decimal>,

    pub last_updated: Option<DateTime<Utc>>,
}

impl PerformanceMetrics {
    pub fn new(strategy_name: impl Into<String>) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            ..Default::default()
        }
    }
}
