//! System wiring, mirroring the teacher's `engine/mod.rs` +
//! `system/builder.rs` split: one composition root that owns every
//! component (C1-C9) and drives a cooperative start/shutdown lifecycle via
//! `tokio::sync::watch`, per spec.md §5.

use crate::{
    config::EngineConfig,
    error::EngineError,
    event::{EventBus, EventFilter, EventPayload, EventType, StatusPayload},
    execution_tracker::ExecutionTracker,
    market_source::MarketDataSource,
    order_engine::{OrderEngine, OrderEngineFillHandler, OrderEngineSignalHandler},
    position::PositionManager,
    queue::OrderQueue,
    strategy_engine::{StrategyEngine, StrategyEngineHandler},
};
use meridian_analytics::PerformanceTracker;
use meridian_execution::{BrokerAdapter, StateStore};
use meridian_instrument::EventPriority;
use meridian_strategy::StrategyLoader;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// The composition root. Every field is reachable for introspection
/// (demos, admin tooling); the lifecycle methods (`start`/`shutdown`) are
/// the intended entry points for driving the whole system.
pub struct Engine {
    pub bus: Arc<EventBus>,
    pub loader: Arc<StrategyLoader>,
    pub strategy_engine: Arc<StrategyEngine>,
    pub order_engine: Arc<OrderEngine>,
    pub positions: Arc<PositionManager>,
    pub queue: Arc<OrderQueue>,
    pub tracker: Arc<ExecutionTracker>,
    pub performance: Arc<PerformanceTracker>,
    store: Arc<dyn StateStore>,
    max_partial_fill_time: chrono::TimeDelta,
    submission_workers: usize,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Engine {
    /// Wires every component together and subscribes the cross-component
    /// event handlers (`MARKET_DATA_RECEIVED` → Strategy Engine,
    /// `TRADING_SIGNAL` → Order Engine, `ORDER_EXECUTED` → Order Engine
    /// fill reconciliation). Does not start the bus workers or any
    /// background loop — call [`Engine::start`] for that.
    pub fn build(
        config: EngineConfig,
        broker: Arc<dyn BrokerAdapter>,
        store: Arc<dyn StateStore>,
        loader: Arc<StrategyLoader>,
    ) -> Arc<Self> {
        let bus = EventBus::new(config.event_bus.clone());
        let positions = Arc::new(PositionManager::new(
            config.position_manager.enable_short_selling,
            config.position_manager.position_size_limit,
        ));
        let queue = Arc::new(OrderQueue::new(
            config.order_queue.max_queue_size,
            config.order_queue.priority_timeout,
            chrono::NaiveTime::from_hms_opt(15, 20, 0).unwrap(),
            config.order_queue.strategy_priorities.clone(),
        ));
        let tracker = Arc::new(ExecutionTracker::new());
        let performance = Arc::new(PerformanceTracker::new());

        let strategy_engine = Arc::new(StrategyEngine::new(
            Arc::clone(&loader),
            Arc::clone(&bus),
            Arc::clone(&store),
            Arc::clone(&positions),
        ));
        let order_engine = Arc::new(OrderEngine::new(
            Arc::clone(&bus),
            broker,
            Arc::clone(&store),
            Arc::clone(&queue),
            Arc::clone(&positions),
            Arc::clone(&tracker),
            config.commission.clone(),
            config.order_engine.clone(),
        ));

        bus.subscribe(
            EventType::MarketDataReceived,
            "strategy_engine",
            EventFilter::default(),
            Arc::new(StrategyEngineHandler(Arc::clone(&strategy_engine))),
        );
        bus.subscribe(
            EventType::TradingSignal,
            "order_engine:signal",
            EventFilter::default(),
            Arc::new(OrderEngineSignalHandler(Arc::clone(&order_engine))),
        );
        bus.subscribe(
            EventType::OrderExecuted,
            "order_engine:fill",
            EventFilter::default(),
            Arc::new(OrderEngineFillHandler(Arc::clone(&order_engine))),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // Bounded below the configured max_concurrent_orders: the queue's
        // priority heap is meant to stay the real bottleneck, not broker
        // round-trip latency from an oversized worker pool.
        let submission_workers = config.order_queue.max_concurrent_orders.clamp(1, 8);
        let max_partial_fill_time = chrono::TimeDelta::from_std(config.execution_monitor.max_partial_fill_time)
            .unwrap_or(chrono::TimeDelta::MAX);

        Arc::new(Self {
            bus,
            loader,
            strategy_engine,
            order_engine,
            positions,
            queue,
            tracker,
            performance,
            store,
            max_partial_fill_time,
            submission_workers,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Restores the Order Queue's pending mirror from `store`, then starts
    /// the bus's worker pool, `max_concurrent_orders` submission workers,
    /// the 30s order timeout sweeper, the 60s stale-partial-fill sweeper,
    /// and (if supplied) a market data source replay task. Publishes
    /// `ENGINE_STARTED`.
    pub fn start(self: &Arc<Self>, market_source: Option<Arc<dyn MarketDataSource>>) {
        self.bus.run();

        {
            let queue = Arc::clone(&self.queue);
            let store = Arc::clone(&self.store);
            tokio::spawn(async move {
                if let Err(err) = queue.restore(store.as_ref()).await {
                    warn!(%err, "order queue restore from store failed");
                }
            });
        }

        for _ in 0..self.submission_workers {
            let order_engine = Arc::clone(&self.order_engine);
            let shutdown_rx = self.shutdown_rx.clone();
            tokio::spawn(async move { order_engine.run_submission_worker(shutdown_rx).await });
        }

        let sweeper_engine = Arc::clone(&self.order_engine);
        let mut sweeper_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(30));
            loop {
                tokio::select! {
                    _ = ticker.tick() => sweeper_engine.sweep_timeouts().await,
                    _ = sweeper_shutdown.changed() => return,
                }
                if *sweeper_shutdown.borrow() {
                    return;
                }
            }
        });

        let stale_tracker = Arc::clone(&self.tracker);
        let stale_bus = Arc::clone(&self.bus);
        let max_partial_fill_time = self.max_partial_fill_time;
        let mut stale_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for entry in stale_tracker.stale_entries(chrono::Utc::now(), max_partial_fill_time) {
                            let event = stale_bus.create_event(
                                "engine:stale_fill_sweeper",
                                EventPayload::StalePartialFillAlert(crate::event::AlertPayload {
                                    order_id: Some(entry.order_id.clone()),
                                    symbol: Some(entry.symbol.clone()),
                                    message: format!(
                                        "order {} partially filled ({}/{}) past max_partial_fill_time",
                                        entry.order_id,
                                        entry.filled_quantity,
                                        entry.total_quantity
                                    ),
                                }),
                                EventPriority::High,
                                None,
                                None,
                            );
                            stale_bus.publish(event).await;
                        }
                    }
                    _ = stale_shutdown.changed() => return,
                }
                if *stale_shutdown.borrow() {
                    return;
                }
            }
        });

        if let Some(source) = market_source {
            let bus = Arc::clone(&self.bus);
            let shutdown_rx = self.shutdown_rx.clone();
            tokio::spawn(async move { source.run(bus, shutdown_rx).await });
        }

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let event = engine.bus.create_event(
                "engine",
                EventPayload::EngineStarted,
                EventPriority::High,
                None,
                None,
            );
            engine.bus.publish(event).await;
        });

        info!("engine started");
    }

    /// Drives every component's shutdown sequence in dependency order
    /// (submission workers first via the watch channel, then the Order
    /// Engine's own in-flight cancellation, then the bus), publishing
    /// `ENGINE_STOPPED` last.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        self.order_engine.shutdown().await;
        if let Err(err) = self.queue.persist(self.store.as_ref()).await {
            warn!(%err, "order queue persist to store failed");
        }
        self.bus.shutdown();

        let event = self.bus.create_event(
            "engine",
            EventPayload::EngineStopped,
            EventPriority::High,
            None,
            None,
        );
        self.bus.publish(event).await;
        info!("engine stopped");
    }

    pub fn health_status(&self) -> StatusPayload {
        let mut details = std::collections::HashMap::new();
        details.insert("bus_healthy".to_string(), self.bus.health_check().to_string());
        details.insert("active_orders".to_string(), self.order_engine.active_order_count().to_string());
        details.insert("queue".to_string(), format!("{:?}", self.queue.get_queue_status()));
        StatusPayload {
            component: "engine".to_string(),
            status: if self.bus.health_check() { "running".to_string() } else { "stopped".to_string() },
            details,
        }
    }

    /// Publishes a single `MARKET_DATA_RECEIVED` event, the entry point for
    /// feeding bar data in through the bus rather than a dedicated
    /// `MarketDataSource`.
    pub async fn publish_market_data(&self, market_data: meridian_strategy::MarketData) -> Result<(), EngineError> {
        let event = self.bus.create_event(
            "engine",
            EventPayload::MarketData(market_data),
            EventPriority::Normal,
            None,
            None,
        );
        if !self.bus.publish(event).await {
            return Err(EngineError::RxDropped(crate::error::RxDropped));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_execution::{store::InMemoryStateStore, MockBrokerAdapter};
    use meridian_instrument::{IntervalType, Symbol};
    use meridian_strategy::{MarketData, MovingAverageMomentum};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn bar(close: rust_decimal::Decimal, volume: rust_decimal::Decimal) -> MarketData {
        MarketData {
            symbol: Symbol::new("005930"),
            timestamp: chrono::Utc::now(),
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
    async fn market_data_flows_through_to_a_submitted_order() {
        let loader = Arc::new(StrategyLoader::new());
        loader.register("momentum", Box::new(MovingAverageMomentum::default())).unwrap();
        loader.activate_strategy("momentum").unwrap();

        let broker = Arc::new(MockBrokerAdapter::new(meridian_execution::AccountBalance::new(
            dec!(100_000_000),
            dec!(100_000_000),
        )));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());

        let engine = Engine::build(EngineConfig::default(), broker, store, loader);
        engine.start(None);

        engine.publish_market_data(bar(dec!(75_200), dec!(1_000_000))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        assert!(engine.order_engine.active_order_count() >= 1 || !engine.queue.get_pending_orders().is_empty());
        engine.shutdown().await;
    }
}
