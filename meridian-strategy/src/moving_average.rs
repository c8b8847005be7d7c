//! The moving-average momentum reference strategy, per spec.md §4.2
//! "Reference strategy (illustrative, informs testable behavior)".
//!
//! Grounded on
//! `examples/original_source/qb/engines/strategy_engine/strategies/moving_average_1m5m.py`
//! (`MovingAverage1M5MStrategy`): same decision rules, same default
//! parameter values, reimplemented as a [`Strategy`] capability rather than
//! a duck-typed subclass.

use crate::{
    market_data::MarketData,
    parameter::{validate, ParamType, ParamValue, ParameterSpec},
    signal::{SignalAction, TradingSignal},
    strategy::{Strategy, StrategyError, StrategyState},
};
use chrono::NaiveTime;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageParams {
    pub ma_period: i64,
    pub market_close_time: NaiveTime,
    pub enable_forced_sell: bool,
    pub min_volume_threshold: Decimal,
    pub enable_volume_filter: bool,
}

impl Default for MovingAverageParams {
    fn default() -> Self {
        Self {
            ma_period: 5,
            market_close_time: NaiveTime::from_hms_opt(15, 20, 0).unwrap(),
            enable_forced_sell: true,
            min_volume_threshold: Decimal::new(30_000_000_000, 0),
            enable_volume_filter: true,
        }
    }
}

#[derive(Debug)]
pub struct MovingAverageMomentum {
    params: Mutex<MovingAverageParams>,
    enabled: Mutex<bool>,
}

impl MovingAverageMomentum {
    pub fn new(params: MovingAverageParams) -> Self {
        Self {
            params: Mutex::new(params),
            enabled: Mutex::new(true),
        }
    }

    fn sma_key(period: i64) -> String {
        format!("sma_{period}")
    }
}

impl Default for MovingAverageMomentum {
    fn default() -> Self {
        Self::new(MovingAverageParams::default())
    }
}

impl Strategy for MovingAverageMomentum {
    fn analyze(&self, market_data: &MarketData) -> Option<TradingSignal> {
        if !*self.enabled.lock() {
            return None;
        }
        if !market_data.interval_type.is_one_minute() {
            return None;
        }

        let params = self.params.lock().clone();
        let sma = market_data.indicator(&Self::sma_key(params.ma_period))?;
        let close = market_data.close;
        let position_held = market_data.position_held();
        let bar_time = market_data.timestamp.time();

        // Forced sell at market close, spec.md §4.2 / scenario S2.
        if bar_time >= params.market_close_time && position_held && params.enable_forced_sell {
            let mut metadata = HashMap::new();
            metadata.insert("forced_market_close_sell".to_string(), "true".to_string());
            return Some(TradingSignal::new(
                SignalAction::Sell,
                market_data.symbol.clone(),
                1.0,
                None,
                None,
                Some("forced market-close liquidation".to_string()),
                metadata,
                market_data.timestamp,
                "moving_average_momentum",
            ));
        }

        if params.enable_volume_filter {
            let avg_volume = market_data
                .indicator("avg_volume_5d")
                .unwrap_or(Decimal::ZERO);
            if avg_volume < params.min_volume_threshold {
                return None;
            }
        }

        if close > sma && !position_held {
            let ratio: f64 = ((close / sma) - Decimal::ONE)
                .to_string()
                .parse()
                .unwrap_or(0.0);
            let confidence = (ratio * 10.0 + 0.7).clamp(0.5, 0.95);
            return Some(TradingSignal::new(
                SignalAction::Buy,
                market_data.symbol.clone(),
                confidence,
                None,
                None,
                Some(format!("close {close} above sma_{}", params.ma_period)),
                HashMap::new(),
                market_data.timestamp,
                "moving_average_momentum",
            ));
        }

        if close <= sma && position_held {
            let price = market_data.indicator("best_bid").or(Some(close));
            let avg_entry = market_data.indicator("position_average_price");
            let confidence = match avg_entry {
                Some(entry) if close > entry => 0.8,
                _ => 0.9,
            };
            return Some(TradingSignal::new(
                SignalAction::Sell,
                market_data.symbol.clone(),
                confidence,
                price,
                None,
                Some(format!("close {close} at/below sma_{}", params.ma_period)),
                HashMap::new(),
                market_data.timestamp,
                "moving_average_momentum",
            ));
        }

        None
    }

    fn required_indicators(&self) -> Vec<String> {
        let period = self.params.lock().ma_period;
        vec![Self::sma_key(period), "avg_volume_5d".to_string()]
    }

    fn parameter_schema(&self) -> HashMap<String, ParameterSpec> {
        let mut schema = HashMap::new();
        schema.insert(
            "ma_period".to_string(),
            ParameterSpec::new(ParamType::Integer)
                .with_default(ParamValue::Integer(5))
                .with_range(2.0, 20.0),
        );
        schema.insert(
            "enable_forced_sell".to_string(),
            ParameterSpec::new(ParamType::Bool).with_default(ParamValue::Bool(true)),
        );
        schema.insert(
            "min_volume_threshold".to_string(),
            ParameterSpec::new(ParamType::Integer)
                .with_default(ParamValue::Integer(30_000_000_000)),
        );
        schema.insert(
            "enable_volume_filter".to_string(),
            ParameterSpec::new(ParamType::Bool).with_default(ParamValue::Bool(true)),
        );
        schema
    }

    fn description(&self) -> &str {
        "Buys when the 1-minute close crosses above its sma_{period}; sells on cross-under \
         or at a configured forced market-close time."
    }

    fn get_state(&self) -> StrategyState {
        let params = self.params.lock();
        let mut parameters = HashMap::new();
        parameters.insert("ma_period".to_string(), ParamValue::Integer(params.ma_period));
        parameters.insert(
            "enable_forced_sell".to_string(),
            ParamValue::Bool(params.enable_forced_sell),
        );
        parameters.insert(
            "enable_volume_filter".to_string(),
            ParamValue::Bool(params.enable_volume_filter),
        );
        StrategyState {
            enabled: *self.enabled.lock(),
            parameters,
        }
    }

    fn enable(&mut self) {
        *self.enabled.lock() = true;
    }

    fn disable(&mut self) {
        *self.enabled.lock() = false;
    }

    fn update_parameters(
        &mut self,
        parameters: HashMap<String, ParamValue>,
    ) -> Result<(), StrategyError> {
        validate(&self.parameter_schema(), &parameters)?;

        let mut params = self.params.lock();
        if let Some(ParamValue::Integer(period)) = parameters.get("ma_period") {
            params.ma_period = *period;
        }
        if let Some(ParamValue::Bool(v)) = parameters.get("enable_forced_sell") {
            params.enable_forced_sell = *v;
        }
        if let Some(ParamValue::Bool(v)) = parameters.get("enable_volume_filter") {
            params.enable_volume_filter = *v;
        }
        if let Some(ParamValue::Integer(v)) = parameters.get("min_volume_threshold") {
            params.min_volume_threshold = Decimal::new(*v, 0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_instrument::{IntervalType, Symbol};
    use rust_decimal_macros::dec;

    fn bar(close: Decimal, sma: Decimal, volume: Decimal, time: &str, position_qty: Decimal) -> MarketData {
        let timestamp = chrono::DateTime::parse_from_rfc3339(time)
            .unwrap()
            .with_timezone(&chrono::Utc);
        let mut indicators = HashMap::new();
        indicators.insert("sma_5".to_string(), sma);
        indicators.insert("avg_volume_5d".to_string(), volume);
        indicators.insert("position_quantity".to_string(), position_qty);
        MarketData {
            symbol: Symbol::new("005930"),
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume,
            interval_type: IntervalType::new("1m"),
            indicators,
        }
    }

    #[test]
    fn buy_when_close_above_sma_and_flat() {
        // S1 from spec.md §8.
        let strategy = MovingAverageMomentum::default();
        let data = bar(
            dec!(75_200),
            dec!(75_000),
            dec!(40_000_000_000),
            "2026-07-26T09:05:00Z",
            Decimal::ZERO,
        );
        let signal = strategy.analyze(&data).unwrap();
        assert_eq!(signal.action, SignalAction::Buy);
        assert!(signal.confidence >= 0.5 && signal.confidence <= 0.95);
    }

    #[test]
    fn forced_sell_at_close_time_when_position_held() {
        // S2 from spec.md §8.
        let strategy = MovingAverageMomentum::default();
        let data = bar(
            dec!(74_500),
            dec!(75_000),
            dec!(40_000_000_000),
            "2026-07-26T15:20:00Z",
            dec!(100),
        );
        let signal = strategy.analyze(&data).unwrap();
        assert_eq!(signal.action, SignalAction::Sell);
        assert_eq!(signal.confidence, 1.0);
        assert_eq!(
            signal.metadata.get("forced_market_close_sell"),
            Some(&"true".to_string())
        );
    }

    #[test]
    fn volume_filter_suppresses_signal_below_threshold() {
        let strategy = MovingAverageMomentum::default();
        let data = bar(
            dec!(75_200),
            dec!(75_000),
            dec!(1_000_000_000),
            "2026-07-26T09:05:00Z",
            Decimal::ZERO,
        );
        assert!(strategy.analyze(&data).is_none());
    }

    #[test]
    fn no_signal_while_holding_and_price_above_sma() {
        let strategy = MovingAverageMomentum::default();
        let data = bar(
            dec!(75_200),
            dec!(75_000),
            dec!(40_000_000_000),
            "2026-07-26T09:05:00Z",
            dec!(100),
        );
        assert!(strategy.analyze(&data).is_none());
    }

    #[test]
    fn disabled_strategy_never_signals() {
        let mut strategy = MovingAverageMomentum::default();
        strategy.disable();
        let data = bar(
            dec!(75_200),
            dec!(75_000),
            dec!(40_000_000_000),
            "2026-07-26T09:05:00Z",
            Decimal::ZERO,
        );
        assert!(strategy.analyze(&data).is_none());
    }
}
