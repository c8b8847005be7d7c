//! Strategy Engine (C6), per spec.md §4.2 "Engine loop". Drives the
//! [`StrategyLoader`]'s active handles against each `MARKET_DATA_RECEIVED`
//! event, publishing `TRADING_SIGNAL` events for every non-HOLD result.

use crate::{
    event::{Event, EventBus, EventPayload, EventType},
    position::PositionManager,
};
use chrono::Utc;
use meridian_execution::StateStore;
use meridian_instrument::EventPriority;
use meridian_strategy::{MarketData, StrategyLoader, TradingSignal};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::{collections::VecDeque, sync::Arc};
use tracing::{debug, warn};

/// Bounded ring of recently emitted signals, retained for diagnostics
/// (spec.md §4.2 step 4: "a bounded-size ring of recent signals retained
/// for diagnostics").
const RECENT_SIGNAL_CAPACITY: usize = 200;

pub struct StrategyEngine {
    loader: Arc<StrategyLoader>,
    bus: Arc<EventBus>,
    store: Arc<dyn StateStore>,
    positions: Arc<PositionManager>,
    recent_signals: Mutex<VecDeque<TradingSignal>>,
}

impl StrategyEngine {
    pub fn new(
        loader: Arc<StrategyLoader>,
        bus: Arc<EventBus>,
        store: Arc<dyn StateStore>,
        positions: Arc<PositionManager>,
    ) -> Self {
        Self {
            loader,
            bus,
            store,
            positions,
            recent_signals: Mutex::new(VecDeque::with_capacity(RECENT_SIGNAL_CAPACITY)),
        }
    }

    /// Injects the position-awareness indicators from the Position
    /// Manager's current snapshot for this symbol, letting strategies
    /// express "position held" rules (e.g. forced-sell, cross-under-close)
    /// without depending on the Position Manager directly.
    fn inject_position_indicators(&self, market_data: &mut MarketData) {
        let (quantity, average_price) = self
            .positions
            .snapshot(&market_data.symbol)
            .map(|p| (p.quantity, p.average_price))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));
        market_data
            .indicators
            .insert("position_quantity".to_string(), quantity);
        market_data
            .indicators
            .insert("position_average_price".to_string(), average_price);
    }

    pub fn recent_signals(&self) -> Vec<TradingSignal> {
        self.recent_signals.lock().iter().cloned().collect()
    }

    /// Synthesizes the declared mock indicator set when nothing has been
    /// populated yet and a current price is available, per spec.md §4.2
    /// step 2 ("used in smoke tests").
    fn synthesize_if_empty(&self, market_data: &mut MarketData) {
        if market_data.indicators.contains_key("sma_5") {
            return;
        }
        market_data
            .indicators
            .entry("sma_5".to_string())
            .or_insert(market_data.close);
        market_data
            .indicators
            .entry("avg_volume_5d".to_string())
            .or_insert(market_data.volume);
    }

    /// Looks up each strategy's required indicators from `indicators:
    /// {symbol}` directly by field, merging any that are present in the
    /// store (the `StateStore` contract only exposes per-field hash
    /// access, not a get-all-fields primitive).
    async fn fill_required_indicators(&self, market_data: &mut MarketData, required: &[String]) {
        let key = format!("indicators:{}", market_data.symbol);
        for name in required {
            if market_data.indicators.contains_key(name) {
                continue;
            }
            if let Ok(Some(raw)) = self.store.hget(&key, name).await {
                if let Ok(value) = raw.parse::<Decimal>() {
                    market_data.indicators.insert(name.clone(), value);
                }
            }
        }
    }

    /// Runs the engine loop for one `MARKET_DATA_RECEIVED` payload,
    /// returning the signals it published.
    pub async fn handle_market_data(&self, mut market_data: MarketData) -> Vec<TradingSignal> {
        self.inject_position_indicators(&mut market_data);
        let mut signals = Vec::new();
        for handle in self.loader.active_handles() {
            if !handle.subscribes_to(&market_data.symbol) {
                continue;
            }

            let required = handle.required_indicators();
            self.fill_required_indicators(&mut market_data, &required).await;
            self.synthesize_if_empty(&mut market_data);

            let missing: Vec<&String> = required
                .iter()
                .filter(|name| !market_data.indicators.contains_key(*name))
                .collect();
            if !missing.is_empty() {
                debug!(strategy = handle.name(), ?missing, "skipping: missing required indicators");
                continue;
            }

            let Some(signal) = handle.analyze(&market_data) else {
                continue;
            };
            if !signal.is_actionable() {
                continue;
            }

            {
                let mut recent = self.recent_signals.lock();
                if recent.len() >= RECENT_SIGNAL_CAPACITY {
                    recent.pop_front();
                }
                recent.push_back(signal.clone());
            }

            let event = self.bus.create_event(
                format!("strategy_engine:{}", handle.name()),
                EventPayload::TradingSignal(signal.clone()),
                EventPriority::Normal,
                None,
                None,
            );
            if !self.bus.publish(event).await {
                warn!(strategy = handle.name(), "failed to publish trading signal");
            }
            signals.push(signal);
        }
        signals
    }
}

/// Adapts [`StrategyEngine`] to the bus's [`crate::event::EventHandler`]
/// seam, so it can be wired as a `MARKET_DATA_RECEIVED` subscriber.
pub struct StrategyEngineHandler(pub Arc<StrategyEngine>);

#[async_trait::async_trait]
impl crate::event::EventHandler for StrategyEngineHandler {
    async fn handle(&self, event: &Event) -> Result<(), String> {
        if event.event_type != EventType::MarketDataReceived {
            return Ok(());
        }
        if let EventPayload::MarketData(market_data) = event.data.clone() {
            self.0.handle_market_data(market_data).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_execution::InMemoryStateStore;
    use meridian_instrument::{IntervalType, Symbol};
    use meridian_strategy::MovingAverageMomentum;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn bar(close: Decimal, volume: Decimal) -> MarketData {
        bar_at(close, volume, Utc::now())
    }

    fn bar_at(close: Decimal, volume: Decimal, timestamp: chrono::DateTime<Utc>) -> MarketData {
        MarketData {
            symbol: Symbol::new("005930"),
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume,
            interval_type: IntervalType::one_minute(),
            indicators: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn buy_signal_is_published_when_close_above_sma() {
        let bus = EventBus::new(crate::event::EventBusConfig::default());
        bus.run();
        let loader = Arc::new(StrategyLoader::new());
        loader
            .register("momentum", Box::new(MovingAverageMomentum::default()))
            .unwrap();
        loader.activate_strategy("momentum").unwrap();
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let positions = Arc::new(PositionManager::new(false, dec!(1_000_000_000)));

        let engine = StrategyEngine::new(loader, bus, store, positions);
        let signals = engine.handle_market_data(bar(dec!(75_200), dec!(1_000_000))).await;

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].action, meridian_strategy::SignalAction::Buy);
    }

    #[tokio::test]
    async fn symbol_subscription_excludes_non_matching_symbols() {
        let bus = EventBus::new(crate::event::EventBusConfig::default());
        bus.run();
        let loader = Arc::new(StrategyLoader::new());
        loader
            .register("momentum", Box::new(MovingAverageMomentum::default()))
            .unwrap();
        loader
            .activate_strategy_for_symbols("momentum", [Symbol::new("000660")].into_iter().collect())
            .unwrap();
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let positions = Arc::new(PositionManager::new(false, dec!(1_000_000_000)));

        let engine = StrategyEngine::new(loader, bus, store, positions);
        let signals = engine.handle_market_data(bar(dec!(75_200), dec!(1_000_000))).await;
        assert!(signals.is_empty());
    }

    #[tokio::test]
    async fn forced_sell_fires_from_position_manager_held_quantity() {
        // S2 from spec.md §8, driven through the real Position Manager
        // rather than a test-supplied `position_quantity` indicator.
        let bus = EventBus::new(crate::event::EventBusConfig::default());
        bus.run();
        let loader = Arc::new(StrategyLoader::new());
        loader
            .register("momentum", Box::new(MovingAverageMomentum::default()))
            .unwrap();
        loader.activate_strategy("momentum").unwrap();
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let positions = Arc::new(PositionManager::new(false, dec!(1_000_000_000)));
        positions.apply_fill(&Symbol::new("005930"), dec!(100), dec!(75_000), Decimal::ZERO, Utc::now());

        let engine = StrategyEngine::new(loader, bus, store, positions);
        let close_time = chrono::DateTime::parse_from_rfc3339("2026-07-26T15:20:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let signals = engine
            .handle_market_data(bar_at(dec!(74_500), dec!(1_000_000), close_time))
            .await;

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].action, meridian_strategy::SignalAction::Sell);
        assert_eq!(
            signals[0].metadata.get("forced_market_close_sell"),
            Some(&"true".to_string())
        );
    }
}
