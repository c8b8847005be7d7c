//! Performance Tracker (C9), per spec.md §4.7.
//!
//! Grounded on
//! `examples/original_source/qb/engines/strategy_engine/performance.py`'s
//! `StrategyPerformanceTracker`: per-strategy signal history plus a
//! recompute-on-close metrics snapshot. The Redis-backed cache there
//! becomes an in-process `parking_lot::RwLock`-guarded table here; a
//! `StateStore`-backed persistence layer is the engine crate's concern, not
//! this one's.

use crate::{
    metric::{drawdown::MaxDrawdownGenerator, profit_factor::ProfitFactor, sharpe::SharpeRatio, win_rate::WinRate},
    record::{PerformanceMetrics, SignalRecord},
};
use chrono::{DateTime, TimeDelta, Utc};
use meridian_strategy::TradingSignal;
use parking_lot::RwLock;
use rust_decimal::{Decimal, MathematicalOps};
use std::collections::HashMap;
use thiserror::Error;

/// Annualized risk-free rate used by the Sharpe Ratio calculation, matching
/// the original tracker's `risk_free_rate = 0.02`.
const RISK_FREE_RATE_ANNUAL: f64 = 0.02;
const TRADING_DAYS_PER_YEAR: i64 = 252;
const MAX_SIGNAL_HISTORY: usize = 1000;

#[derive(Debug, Error, PartialEq)]
pub enum PerformanceTrackerError {
    #[error("signal {0:?} is not recorded")]
    UnknownSignal(String),
    #[error("signal {0:?} has not been executed yet")]
    NotExecuted(String),
    #[error("signal {0:?} is already closed")]
    AlreadyClosed(String),
}

#[derive(Default)]
struct StrategyState {
    records: HashMap<String, SignalRecord>,
    /// Most-recent-first order of recorded signal ids, capped at
    /// `MAX_SIGNAL_HISTORY`, mirroring the original's `trim_list(history, 0, 999)`.
    history: Vec<String>,
    metrics: PerformanceMetrics,
}

/// Tracks, per strategy, every signal emitted and the derived performance
/// metrics recomputed from closed trades.
#[derive(Default)]
pub struct PerformanceTracker {
    strategies: RwLock<HashMap<String, StrategyState>>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly emitted signal, returning its generated id.
    pub fn record_signal(&self, strategy_name: &str, signal: &TradingSignal) -> String {
        let record = SignalRecord::from_signal(strategy_name, signal);
        let signal_id = record.signal_id.clone();

        let mut strategies = self.strategies.write();
        let state = strategies.entry(strategy_name.to_string()).or_default();

        state.history.insert(0, signal_id.clone());
        state.history.truncate(MAX_SIGNAL_HISTORY);
        state.records.insert(signal_id.clone(), record);

        state.metrics.strategy_name = strategy_name.to_string();
        state.metrics.total_signals += 1;
        match signal.action {
            meridian_strategy::SignalAction::Buy => state.metrics.buy_signals += 1,
            meridian_strategy::SignalAction::Sell => state.metrics.sell_signals += 1,
            meridian_strategy::SignalAction::Hold => state.metrics.hold_signals += 1,
        }
        state.metrics.last_updated = Some(signal.timestamp);

        signal_id
    }

    pub fn record_execution(
        &self,
        strategy_name: &str,
        signal_id: &str,
        execution_price: Decimal,
        execution_time: DateTime<Utc>,
    ) -> Result<(), PerformanceTrackerError> {
        let mut strategies = self.strategies.write();
        let state = strategies
            .get_mut(strategy_name)
            .ok_or_else(|| PerformanceTrackerError::UnknownSignal(signal_id.to_string()))?;
        let record = state
            .records
            .get_mut(signal_id)
            .ok_or_else(|| PerformanceTrackerError::UnknownSignal(signal_id.to_string()))?;
        record.mark_executed(execution_price, execution_time);
        Ok(())
    }

    pub fn update_position_pnl(
        &self,
        strategy_name: &str,
        signal_id: &str,
        current_price: Decimal,
    ) -> Result<(), PerformanceTrackerError> {
        let mut strategies = self.strategies.write();
        let state = strategies
            .get_mut(strategy_name)
            .ok_or_else(|| PerformanceTrackerError::UnknownSignal(signal_id.to_string()))?;
        let record = state
            .records
            .get_mut(signal_id)
            .ok_or_else(|| PerformanceTrackerError::UnknownSignal(signal_id.to_string()))?;

        if !record.executed {
            return Err(PerformanceTrackerError::NotExecuted(signal_id.to_string()));
        }
        if record.closed {
            return Err(PerformanceTrackerError::AlreadyClosed(signal_id.to_string()));
        }
        record.mark_to_market(current_price);
        drop(strategies);
        self.recalculate(strategy_name);
        Ok(())
    }

    pub fn close_position(
        &self,
        strategy_name: &str,
        signal_id: &str,
        close_price: Decimal,
        close_time: DateTime<Utc>,
    ) -> Result<(), PerformanceTrackerError> {
        {
            let mut strategies = self.strategies.write();
            let state = strategies
                .get_mut(strategy_name)
                .ok_or_else(|| PerformanceTrackerError::UnknownSignal(signal_id.to_string()))?;
            let record = state
                .records
                .get_mut(signal_id)
                .ok_or_else(|| PerformanceTrackerError::UnknownSignal(signal_id.to_string()))?;

            if !record.executed {
                return Err(PerformanceTrackerError::NotExecuted(signal_id.to_string()));
            }
            if record.closed {
                return Err(PerformanceTrackerError::AlreadyClosed(signal_id.to_string()));
            }
            record.close(close_price, close_time);
        }
        self.recalculate(strategy_name);
        Ok(())
    }

    pub fn strategy_performance(&self, strategy_name: &str) -> Option<PerformanceMetrics> {
        self.strategies
            .read()
            .get(strategy_name)
            .map(|s| s.metrics.clone())
    }

    pub fn all_strategies_performance(&self) -> HashMap<String, PerformanceMetrics> {
        self.strategies
            .read()
            .iter()
            .map(|(name, state)| (name.clone(), state.metrics.clone()))
            .collect()
    }

    /// Most-recent-first signal history, capped at `limit`.
    pub fn signal_history(&self, strategy_name: &str, limit: usize) -> Vec<SignalRecord> {
        let strategies = self.strategies.read();
        let Some(state) = strategies.get(strategy_name) else {
            return Vec::new();
        };
        state
            .history
            .iter()
            .take(limit)
            .filter_map(|id| state.records.get(id).cloned())
            .collect()
    }

    /// Recomputes the full [`PerformanceMetrics`] snapshot for a strategy
    /// from its recorded signals, mirroring
    /// `_recalculate_strategy_metrics` in the grounding source.
    fn recalculate(&self, strategy_name: &str) {
        let mut strategies = self.strategies.write();
        let Some(state) = strategies.get_mut(strategy_name) else {
            return;
        };

        let mut metrics = PerformanceMetrics::new(strategy_name);
        metrics.total_signals = state.records.len() as u64;

        let mut total_pnl = Decimal::ZERO;
        let mut realized_pnl = Decimal::ZERO;
        let mut unrealized_pnl = Decimal::ZERO;
        let mut winning_trades = 0u64;
        let mut losing_trades = 0u64;
        let mut returns: Vec<Decimal> = Vec::new();
        let mut hold_times: Vec<TimeDelta> = Vec::new();
        let mut current_streak: i64 = 0;
        let mut best_streak: u64 = 0;
        let mut worst_streak: u64 = 0;
        let mut best_trade: Option<Decimal> = None;
        let mut worst_trade: Option<Decimal> = None;
        let mut gross_profit: Decimal = Decimal::ZERO;
        let mut gross_loss: Decimal = Decimal::ZERO;

        let mut ordered: Vec<&SignalRecord> = state.records.values().collect();
        ordered.sort_by_key(|r| r.timestamp);

        for record in ordered {
            match record.action {
                meridian_strategy::SignalAction::Buy => metrics.buy_signals += 1,
                meridian_strategy::SignalAction::Sell => metrics.sell_signals += 1,
                meridian_strategy::SignalAction::Hold => metrics.hold_signals += 1,
            }

            let Some(pnl) = record.pnl else { continue };
            total_pnl += pnl;

            if record.closed {
                realized_pnl += pnl;

                best_trade = Some(best_trade.map_or(pnl, |b| b.max(pnl)));
                worst_trade = Some(worst_trade.map_or(pnl, |w| w.min(pnl)));

                if pnl > Decimal::ZERO {
                    winning_trades += 1;
                    gross_profit += pnl;
                    current_streak = if current_streak > 0 { current_streak + 1 } else { 1 };
                } else if pnl < Decimal::ZERO {
                    losing_trades += 1;
                    gross_loss += pnl.abs();
                    current_streak = if current_streak < 0 { current_streak - 1 } else { -1 };
                }
                best_streak = best_streak.max(current_streak.max(0) as u64);
                worst_streak = worst_streak.max((-current_streak).max(0) as u64);

                if let (Some(price), qty) = (record.execution_price, record.quantity) {
                    if price > Decimal::ZERO && !qty.is_zero() {
                        returns.push(pnl / (price * qty));
                    }
                }
                if let Some(hold) = record.hold_time() {
                    hold_times.push(hold);
                }
            } else {
                unrealized_pnl += pnl;
            }
        }

        metrics.total_return = total_pnl;
        metrics.realized_pnl = realized_pnl;
        metrics.unrealized_pnl = unrealized_pnl;
        metrics.winning_trades = winning_trades;
        metrics.losing_trades = losing_trades;
        metrics.current_streak = current_streak;
        metrics.best_streak = best_streak;
        metrics.worst_streak = worst_streak;
        metrics.best_trade = best_trade;
        metrics.worst_trade = worst_trade;

        let closed_trades = winning_trades + losing_trades;
        if closed_trades > 0 {
            metrics.win_rate = WinRate::calculate(
                Decimal::from(winning_trades),
                Decimal::from(closed_trades),
            );
            metrics.profit_factor = ProfitFactor::calculate(gross_profit, gross_loss);
        }

        if !hold_times.is_empty() {
            let total_seconds: i64 = hold_times.iter().map(TimeDelta::num_seconds).sum();
            metrics.avg_hold_time = Some(TimeDelta::seconds(total_seconds / hold_times.len() as i64));
        }

        if returns.len() > 1 {
            let mean = mean(&returns);
            let std_dev = std_dev(&returns, mean);
            let annualization = Decimal::from(TRADING_DAYS_PER_YEAR).sqrt().unwrap();
            metrics.volatility = std_dev * annualization;

            if metrics.volatility > Decimal::ZERO {
                let daily_risk_free =
                    Decimal::try_from(RISK_FREE_RATE_ANNUAL).unwrap() / Decimal::from(TRADING_DAYS_PER_YEAR);
                let daily_vol = metrics.volatility / annualization;
                metrics.sharpe_ratio = Some(SharpeRatio::calculate(
                    daily_risk_free,
                    mean,
                    daily_vol,
                    TimeDelta::days(1),
                ));
            }

            let anchor = state
                .records
                .values()
                .map(|r| r.timestamp)
                .max()
                .unwrap_or_else(Utc::now);
            let mut drawdown_gen = MaxDrawdownGenerator::init(anchor);
            let mut cumulative = Decimal::ONE;
            let mut max_drawdown = None;
            for r in &returns {
                cumulative *= Decimal::ONE + r;
                max_drawdown = Some(drawdown_gen.update(cumulative - Decimal::ONE, anchor));
            }
            metrics.max_drawdown = max_drawdown;
        }

        metrics.last_updated = Some(Utc::now());
        state.metrics = metrics;
    }
}

fn mean(values: &[Decimal]) -> Decimal {
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}

fn std_dev(values: &[Decimal], mean: Decimal) -> Decimal {
    let variance = values
        .iter()
        .map(|v| (*v - mean) * (*v - mean))
        .sum::<Decimal>()
        / Decimal::from(values.len());
    variance.sqrt().unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_instrument::Symbol;
    use meridian_strategy::SignalAction;
    use rust_decimal_macros::dec;

    fn signal(action: SignalAction, price: Decimal, quantity: Decimal, at: DateTime<Utc>) -> TradingSignal {
        TradingSignal::new(
            action,
            Symbol::new("005930"),
            0.8,
            Some(price),
            Some(quantity),
            None,
            HashMap::new(),
            at,
            "moving_average_momentum",
        )
    }

    #[test]
    fn record_execute_and_close_produces_realized_pnl_and_win_rate() {
        let tracker = PerformanceTracker::new();
        let t0 = DateTime::<Utc>::MIN_UTC;
        let buy = signal(SignalAction::Buy, dec!(75_000), dec!(10), t0);
        let id = tracker.record_signal("moving_average_momentum", &buy);

        tracker
            .record_execution("moving_average_momentum", &id, dec!(75_000), t0)
            .unwrap();
        tracker
            .close_position(
                "moving_average_momentum",
                &id,
                dec!(76_000),
                t0 + TimeDelta::hours(2),
            )
            .unwrap();

        let metrics = tracker.strategy_performance("moving_average_momentum").unwrap();
        assert_eq!(metrics.realized_pnl, dec!(10_000));
        assert_eq!(metrics.winning_trades, 1);
        assert_eq!(metrics.losing_trades, 0);
        assert_eq!(metrics.win_rate.unwrap().value, Decimal::ONE);
        assert_eq!(metrics.best_trade, Some(dec!(10_000)));
    }

    #[test]
    fn closing_unexecuted_signal_is_rejected() {
        let tracker = PerformanceTracker::new();
        let t0 = DateTime::<Utc>::MIN_UTC;
        let buy = signal(SignalAction::Buy, dec!(75_000), dec!(10), t0);
        let id = tracker.record_signal("moving_average_momentum", &buy);

        let err = tracker
            .close_position("moving_average_momentum", &id, dec!(76_000), t0)
            .unwrap_err();
        assert!(matches!(err, PerformanceTrackerError::NotExecuted(_)));
    }

    #[test]
    fn double_close_is_rejected() {
        let tracker = PerformanceTracker::new();
        let t0 = DateTime::<Utc>::MIN_UTC;
        let buy = signal(SignalAction::Buy, dec!(75_000), dec!(10), t0);
        let id = tracker.record_signal("moving_average_momentum", &buy);
        tracker
            .record_execution("moving_average_momentum", &id, dec!(75_000), t0)
            .unwrap();
        tracker
            .close_position("moving_average_momentum", &id, dec!(76_000), t0)
            .unwrap();

        let err = tracker
            .close_position("moving_average_momentum", &id, dec!(77_000), t0)
            .unwrap_err();
        assert!(matches!(err, PerformanceTrackerError::AlreadyClosed(_)));
    }

    #[test]
    fn losing_trade_updates_worst_streak() {
        let tracker = PerformanceTracker::new();
        let t0 = DateTime::<Utc>::MIN_UTC;
        let sell = signal(SignalAction::Buy, dec!(75_000), dec!(10), t0);
        let id = tracker.record_signal("moving_average_momentum", &sell);
        tracker
            .record_execution("moving_average_momentum", &id, dec!(75_000), t0)
            .unwrap();
        tracker
            .close_position("moving_average_momentum", &id, dec!(74_000), t0)
            .unwrap();

        let metrics = tracker.strategy_performance("moving_average_momentum").unwrap();
        assert_eq!(metrics.losing_trades, 1);
        assert_eq!(metrics.worst_trade, Some(dec!(-10_000)));
        assert_eq!(metrics.current_streak, -1);
    }
}
