//! Order Engine (C7), per spec.md §4.3.
//!
//! Grounded on
//! `examples/original_source/qb/engines/order_engine/order_engine.py`
//! (signal sizing, pre-trade checks, submission, fill reconciliation,
//! timeout sweep) and the teacher's worker-pool idiom in
//! `core/src/execution/builder.rs` for the submission loop.

use crate::{
    config::OrderEngineConfig,
    error::EngineError,
    event::{
        Event, EventBus, EventHandler, EventPayload, EventType, OrderPlacedPayload,
        OrderProgressPayload, OrderTerminalPayload,
    },
    execution_tracker::{ExecutionTracker, FillProgress},
    position::PositionManager,
    queue::OrderQueue,
};
use async_trait::async_trait;
use chrono::Utc;
use meridian_execution::{
    order::{Order, OrderId},
    AccountBalance, BrokerAdapter, BrokerError, Fill, StateStore,
};
use meridian_instrument::{EventPriority, OrderStatus, OrderType, Side, Symbol, TimeInForce};
use meridian_risk::{CommissionSchedule, PreTradeCheck, RiskApproved, RiskRefused};
use meridian_strategy::TradingSignal;
use parking_lot::RwLock;
use rust_decimal::{prelude::FromPrimitive, Decimal};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{info, warn};

/// Multiplier cap from spec.md §4.3 "Signal → Order": confidence scales
/// the cash fraction deployed, never exceeding 1.5x the baseline 10%.
const MAX_CONFIDENCE_MULTIPLIER: Decimal = Decimal::from_parts(15, 0, 0, false, 1);
/// The cash fraction baseline, 10%.
const CASH_FRACTION: Decimal = Decimal::from_parts(10, 0, 0, false, 2);
const MAX_SUBMIT_ATTEMPTS: u32 = 3;

/// The Order Engine (C7): turns `TradingSignal`s into broker orders,
/// enforces pre-trade checks, drives the submission pipeline and fill
/// reconciliation, and sweeps timed-out orders.
pub struct OrderEngine {
    bus: Arc<EventBus>,
    broker: Arc<dyn BrokerAdapter>,
    store: Arc<dyn StateStore>,
    queue: Arc<OrderQueue>,
    positions: Arc<PositionManager>,
    tracker: Arc<ExecutionTracker>,
    commission: CommissionSchedule,
    config: OrderEngineConfig,
    /// Live orders keyed by our own [`OrderId`] — PENDING through
    /// PARTIAL_FILLED; removed on terminal status.
    active_orders: RwLock<HashMap<OrderId, Order>>,
    /// Reverse lookup from the broker's own order id, for fill notices that
    /// only carry `broker_order_id`.
    broker_index: RwLock<HashMap<String, OrderId>>,
}

impl OrderEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: Arc<EventBus>,
        broker: Arc<dyn BrokerAdapter>,
        store: Arc<dyn StateStore>,
        queue: Arc<OrderQueue>,
        positions: Arc<PositionManager>,
        tracker: Arc<ExecutionTracker>,
        commission: CommissionSchedule,
        config: OrderEngineConfig,
    ) -> Self {
        Self {
            bus,
            broker,
            store,
            queue,
            positions,
            tracker,
            commission,
            config,
            active_orders: RwLock::new(HashMap::new()),
            broker_index: RwLock::new(HashMap::new()),
        }
    }

    pub fn active_order(&self, order_id: &OrderId) -> Option<Order> {
        self.active_orders.read().get(order_id).cloned()
    }

    pub fn active_order_count(&self) -> usize {
        self.active_orders.read().len()
    }

    /// Deletes both possible `StateStore` mirror keys for `order_id` once
    /// it has left the queue for good, regardless of which bucket
    /// (`pending`/`processing`) it was persisted under.
    async fn forget_persisted(&self, order_id: &OrderId) {
        let _ = self.store.delete(&format!("pending:{order_id}")).await;
        let _ = self.store.delete(&format!("processing:{order_id}")).await;
    }

    /// The price a signal should be sized and valued against: the signal's
    /// own declared price, falling back to the symbol's last known market
    /// price when the signal carries none (a MARKET signal still needs a
    /// reference to size against).
    fn reference_price(&self, signal: &TradingSignal) -> Option<Decimal> {
        signal.price.or_else(|| {
            self.positions
                .snapshot(&signal.symbol)
                .map(|p| p.market_price)
                .filter(|p| !p.is_zero())
        })
    }

    /// Order type/price/stop_price from the signal, per spec.md §4.3
    /// "Order type": MARKET unless the signal carries a price (→ LIMIT),
    /// unless metadata names STOP/STOP_LIMIT with a `stop_price`.
    fn resolve_order_shape(
        &self,
        signal: &TradingSignal,
    ) -> (OrderType, Option<Decimal>, Option<Decimal>) {
        let stop_price = signal
            .metadata
            .get("stop_price")
            .and_then(|v| v.parse::<Decimal>().ok());

        match signal.metadata.get("order_type").map(String::as_str) {
            Some("stop") if stop_price.is_some() => (OrderType::Stop, None, stop_price),
            Some("stop_limit") if stop_price.is_some() && signal.price.is_some() => {
                (OrderType::StopLimit, signal.price, stop_price)
            }
            _ => match signal.price {
                Some(price) => (OrderType::Limit, Some(price), None),
                None => (OrderType::Market, None, None),
            },
        }
    }

    /// `floor(min(available_cash * 0.10, max_order_value) *
    /// min(confidence * 1.5, 1.5) / price)`, clamped to
    /// `[min_order_quantity, max_order_quantity]`, per spec.md §4.3.
    fn size_quantity(&self, signal: &TradingSignal, balance: &AccountBalance, price: Decimal) -> Option<Decimal> {
        if let Some(quantity) = signal.quantity {
            return Some(quantity);
        }
        if price.is_zero() {
            return None;
        }

        let confidence = Decimal::from_f64(signal.confidence).unwrap_or(Decimal::ZERO);
        let multiplier = (confidence * MAX_CONFIDENCE_MULTIPLIER).min(MAX_CONFIDENCE_MULTIPLIER);
        let cash_component = (balance.available_cash * CASH_FRACTION).min(self.config.max_order_value);
        let raw = (cash_component * multiplier / price).floor();

        Some(raw.clamp(self.config.min_order_quantity, self.config.max_order_quantity))
    }

    /// Builds an `Order` from a `TradingSignal`, per spec.md §4.3
    /// "Signal → Order". Returns `None` when no order can be sized (no
    /// reference price, or a non-positive resulting quantity).
    pub fn build_order_from_signal(&self, signal: &TradingSignal, balance: &AccountBalance) -> Option<Order> {
        let side = match signal.action {
            meridian_strategy::SignalAction::Buy => Side::Buy,
            meridian_strategy::SignalAction::Sell => Side::Sell,
            meridian_strategy::SignalAction::Hold => return None,
        };

        let reference_price = self.reference_price(signal)?;
        let quantity = self.size_quantity(signal, balance, reference_price)?;
        if quantity <= Decimal::ZERO {
            return None;
        }

        let (order_type, price, stop_price) = self.resolve_order_shape(signal);
        let time_in_force = match signal.metadata.get("time_in_force").map(String::as_str) {
            Some("gtc") => TimeInForce::Gtc,
            Some("ioc") => TimeInForce::Ioc,
            Some("fok") => TimeInForce::Fok,
            _ => TimeInForce::Day,
        };

        Order::new(
            OrderId::generate(),
            signal.symbol.clone(),
            side,
            order_type,
            quantity,
            price,
            stop_price,
            time_in_force,
            Some(signal.strategy_name.clone()),
            Utc::now(),
            signal.metadata.clone(),
        )
        .ok()
    }

    /// The four pre-trade checks from spec.md §4.3, first failure wins.
    fn validate_pretrade(
        &self,
        order: Order,
        value_price: Decimal,
        balance: &AccountBalance,
    ) -> Result<RiskApproved<Order>, RiskRefused<Order>> {
        if order.quantity <= Decimal::ZERO {
            return Err(RiskRefused::new(order, PreTradeCheck::NonPositiveQuantity));
        }

        let order_value = order.quantity * value_price;
        if order_value > self.config.max_order_value {
            return Err(RiskRefused::new(order, PreTradeCheck::ExceedsMaxOrderValue));
        }

        if !self.positions.can_open(&order.symbol, self.config.max_position_count) {
            return Err(RiskRefused::new(order, PreTradeCheck::ExceedsMaxPositionCount));
        }

        if order.side == Side::Buy && order_value > balance.available_cash {
            return Err(RiskRefused::new(order, PreTradeCheck::InsufficientCash));
        }

        Ok(RiskApproved::new(order))
    }

    /// Builds, validates, and enqueues an order for `signal`. Returns the
    /// generated `OrderId` on success.
    pub async fn accept_signal(&self, signal: &TradingSignal) -> Result<OrderId, EngineError> {
        let balance = self.broker.get_account_balance().await?;
        let Some(order) = self.build_order_from_signal(signal, &balance) else {
            return Err(EngineError::RiskRejected("could not size an order for signal".into()));
        };

        let value_price = order
            .price
            .or(signal.price)
            .unwrap_or_else(|| self.positions.snapshot(&order.symbol).map(|p| p.market_price).unwrap_or_default());

        let order = match self.validate_pretrade(order, value_price, &balance) {
            Ok(approved) => approved.into_item(),
            Err(refused) => {
                let alert = self.bus.create_event(
                    "order_engine",
                    EventPayload::RiskAlert(crate::event::AlertPayload {
                        order_id: None,
                        symbol: Some(refused.item.symbol.clone()),
                        message: refused.reason.to_string(),
                    }),
                    EventPriority::High,
                    None,
                    None,
                );
                self.bus.publish(alert).await;
                return Err(EngineError::RiskRejected(refused.reason.to_string()));
            }
        };

        let order_id = order.order_id.clone();
        self.queue
            .add_order(order.clone())
            .map_err(|_| EngineError::QueueFull { capacity: 0 })?;
        if let Ok(json) = serde_json::to_string(&order) {
            let _ = self.store.put(&format!("pending:{order_id}"), json).await;
        }
        self.active_orders.write().insert(order_id.clone(), order);
        Ok(order_id)
    }

    /// Submits one dequeued order to the broker, retrying bounded
    /// exponential backoff for retryable `BrokerError`s and publishing the
    /// terminal event either way, per spec.md §4.3 "Submission pipeline"
    /// and "Errors".
    async fn submit_one(&self, mut order: Order) {
        order.transition(OrderStatus::Submitted, Utc::now());

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.broker.place_order(&order).await {
                Ok(result) if result.success => {
                    let broker_order_id = result.broker_order_id.unwrap_or_else(|| order.order_id.0.clone());
                    self.broker_index.write().insert(broker_order_id.clone(), order.order_id.clone());
                    self.tracker.track(order.order_id.clone(), order.symbol.clone(), order.quantity, Utc::now());
                    self.active_orders.write().insert(order.order_id.clone(), order.clone());

                    let _ = self
                        .store
                        .put(&format!("order_broker:{}", order.order_id), broker_order_id.clone())
                        .await;
                    let _ = self
                        .store
                        .put(&format!("broker_order:{broker_order_id}"), order.order_id.0.clone())
                        .await;

                    let event = self.bus.create_event(
                        "order_engine",
                        EventPayload::OrderPlaced(OrderPlacedPayload {
                            order_id: order.order_id.clone(),
                            broker_order_id,
                            symbol: order.symbol.clone(),
                        }),
                        EventPriority::Normal,
                        None,
                        None,
                    );
                    self.bus.publish(event).await;
                    return;
                }
                Ok(_failed) => {
                    self.fail_order(order, "broker declined order").await;
                    return;
                }
                Err(err) if err.is_retryable() && attempt < MAX_SUBMIT_ATTEMPTS => {
                    let backoff = Duration::from_millis(200 * 2u64.pow(attempt - 1));
                    warn!(order_id = %order.order_id, attempt, %err, "retrying order submission");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                Err(err) => {
                    self.fail_order(order, &err.to_string()).await;
                    return;
                }
            }
        }
    }

    async fn fail_order(&self, mut order: Order, reason: &str) {
        order.transition(OrderStatus::Failed, Utc::now());
        self.queue.remove_order(&order.order_id);
        self.forget_persisted(&order.order_id).await;
        self.active_orders.write().remove(&order.order_id);

        let event = self.bus.create_event(
            "order_engine",
            EventPayload::OrderFailed(OrderTerminalPayload {
                order_id: order.order_id.clone(),
                reason: reason.to_string(),
                result: None,
            }),
            EventPriority::High,
            None,
            None,
        );
        self.bus.publish(event).await;
    }

    /// Runs the submission loop until `shutdown` fires: pops the next
    /// dispatchable order and submits it, sleeping briefly when the queue
    /// is empty. Intended to be spawned as one of `max_concurrent_orders`
    /// workers.
    pub async fn run_submission_worker(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }
            let (next, evicted) = self.queue.get_next_order(Utc::now(), Utc::now().time());
            for order_id in evicted {
                self.forget_persisted(&order_id).await;
            }
            match next {
                Some(order) => self.submit_one(order).await,
                None => {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(50)) => {}
                        _ = shutdown.changed() => return,
                    }
                }
            }
        }
    }

    /// Applies a broker fill notice to its order and the position book,
    /// per spec.md §4.3 "Fill reconciliation". Publishes
    /// `ORDER_PARTIALLY_EXECUTED` / `ORDER_FULLY_EXECUTED`.
    pub async fn reconcile_fill(&self, notice: crate::event::BrokerFillNotice) -> Result<(), EngineError> {
        let order_id = self.resolve_order_id(&notice).await;
        let Some(order_id) = order_id else {
            warn!(?notice, "fill notice for unknown order");
            return Err(EngineError::OrderNotFound { order_id: "unknown".into() });
        };

        let Some(mut order) = self.active_orders.read().get(&order_id).cloned() else {
            return Err(EngineError::OrderNotFound { order_id: order_id.0 });
        };

        let commission = if notice.commission.is_zero() {
            self.commission.calculate(&order, notice.price, notice.quantity).total
        } else {
            notice.commission
        };

        order.apply_fill(notice.quantity, notice.price, commission, notice.timestamp)?;
        self.active_orders.write().insert(order_id.clone(), order.clone());

        let signed_quantity = Decimal::from(order.side.sign()) * notice.quantity;
        let position = self
            .positions
            .apply_fill(&order.symbol, signed_quantity, notice.price, commission, notice.timestamp);

        let position_event = self.bus.create_event(
            "order_engine",
            EventPayload::PositionUpdated(crate::event::PositionUpdatedPayload {
                symbol: position.symbol.clone(),
                quantity: position.quantity,
                average_price: position.average_price,
                unrealized_pnl: position.unrealized_pnl,
                realized_pnl: position.realized_pnl,
            }),
            EventPriority::Normal,
            None,
            None,
        );
        self.bus.publish(position_event).await;

        let fill_id = notice
            .broker_fill_id
            .clone()
            .unwrap_or_else(|| format!("{order_id}-{}", notice.timestamp.timestamp_nanos_opt().unwrap_or_default()));
        let fill = Fill::new(
            fill_id,
            order_id.clone(),
            order.symbol.clone(),
            order.side,
            notice.quantity,
            notice.price,
            commission,
            notice.timestamp,
            notice.broker_fill_id.clone(),
            HashMap::new(),
        );
        let progress = self.tracker.add_fill(fill)?;

        let payload = OrderProgressPayload {
            order_id: order_id.clone(),
            symbol: order.symbol.clone(),
            filled_quantity: order.filled_quantity,
            average_fill_price: order.average_fill_price,
        };

        let (event_type_payload, is_terminal) = match progress {
            FillProgress::Partial => (EventPayload::OrderPartiallyExecuted(payload), false),
            FillProgress::Complete => (EventPayload::OrderFullyExecuted(payload), true),
        };

        let event = self.bus.create_event("order_engine", event_type_payload, EventPriority::Normal, None, None);
        self.bus.publish(event).await;

        if is_terminal {
            self.queue.remove_order(&order_id);
            self.forget_persisted(&order_id).await;
            self.active_orders.write().remove(&order_id);
            self.tracker.untrack(&order_id);
        }

        Ok(())
    }

    async fn resolve_order_id(&self, notice: &crate::event::BrokerFillNotice) -> Option<OrderId> {
        if let Some(order_id) = &notice.order_id {
            return Some(order_id.clone());
        }
        let broker_order_id = notice.broker_order_id.as_ref()?;
        if let Some(order_id) = self.broker_index.read().get(broker_order_id).cloned() {
            return Some(order_id);
        }
        self.store
            .get(&format!("broker_order:{broker_order_id}"))
            .await
            .ok()
            .flatten()
            .map(OrderId::new)
    }

    /// Cancels every order older than `order_timeout`, per spec.md §4.3
    /// "Timeout sweeper". Intended to run on a periodic tick (e.g. every
    /// 30s).
    pub async fn sweep_timeouts(&self) {
        let now = Utc::now();
        let stale: Vec<Order> = self
            .active_orders
            .read()
            .values()
            .filter(|o| o.is_active() && now.signed_duration_since(o.created_at).to_std().unwrap_or_default() > self.config.order_timeout)
            .cloned()
            .collect();

        for order in stale {
            if let Err(err) = self.broker.cancel_order(&order.order_id).await {
                warn!(order_id = %order.order_id, %err, "timeout cancellation failed");
                continue;
            }
            self.queue.remove_order(&order.order_id);
            self.forget_persisted(&order.order_id).await;
            self.active_orders.write().remove(&order.order_id);
            self.tracker.untrack(&order.order_id);

            let event = self.bus.create_event(
                "order_engine",
                EventPayload::OrderCancelled(OrderTerminalPayload {
                    order_id: order.order_id.clone(),
                    reason: "timeout".to_string(),
                    result: None,
                }),
                EventPriority::Normal,
                None,
                None,
            );
            self.bus.publish(event).await;
        }
    }

    /// Cancels every still-active order and publishes a terminal
    /// `SYSTEM_STATUS`, per spec.md §4.3 "Shutdown".
    pub async fn shutdown(&self) {
        let active: Vec<OrderId> = self.active_orders.read().keys().cloned().collect();
        for order_id in active {
            let _ = self.broker.cancel_order(&order_id).await;
            self.queue.remove_order(&order_id);
            self.forget_persisted(&order_id).await;
            self.tracker.untrack(&order_id);
        }
        self.active_orders.write().clear();

        let mut details = HashMap::new();
        details.insert("reason".to_string(), "shutdown".to_string());
        let event = self.bus.create_event(
            "order_engine",
            EventPayload::SystemStatus(crate::event::StatusPayload {
                component: "order_engine".to_string(),
                status: "stopped".to_string(),
                details,
            }),
            EventPriority::Normal,
            None,
            None,
        );
        self.bus.publish(event).await;
        info!("order engine shut down");
    }
}

/// Adapts [`OrderEngine`] to the bus's [`EventHandler`] seam for inbound
/// `ORDER_EXECUTED` broker fill notices.
pub struct OrderEngineFillHandler(pub Arc<OrderEngine>);

#[async_trait]
impl EventHandler for OrderEngineFillHandler {
    async fn handle(&self, event: &Event) -> Result<(), String> {
        if event.event_type != EventType::OrderExecuted {
            return Ok(());
        }
        if let EventPayload::OrderExecuted(notice) = event.data.clone() {
            self.0.reconcile_fill(notice).await.map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

/// Adapts [`OrderEngine`] to the bus's [`EventHandler`] seam for inbound
/// `TRADING_SIGNAL` events published by the Strategy Engine.
pub struct OrderEngineSignalHandler(pub Arc<OrderEngine>);

#[async_trait]
impl EventHandler for OrderEngineSignalHandler {
    async fn handle(&self, event: &Event) -> Result<(), String> {
        if event.event_type != EventType::TradingSignal {
            return Ok(());
        }
        if let EventPayload::TradingSignal(signal) = &event.data {
            match self.0.accept_signal(signal).await {
                Ok(_) | Err(EngineError::RiskRejected(_)) => Ok(()),
                Err(err) => Err(err.to_string()),
            }
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_execution::{store::InMemoryStateStore, MockBrokerAdapter};
    use meridian_strategy::SignalAction;
    use rust_decimal_macros::dec;
    use std::collections::HashMap as Map;

    fn engine() -> (Arc<OrderEngine>, Arc<EventBus>) {
        let bus = EventBus::new(crate::event::EventBusConfig::default());
        bus.run();
        let broker = Arc::new(MockBrokerAdapter::new(AccountBalance::new(dec!(10_000_000), dec!(10_000_000))));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        // Market close pinned past midnight so a DAY order never expires
        // mid-test regardless of wall-clock time when the suite runs.
        let queue = Arc::new(OrderQueue::new(100, Duration::from_secs(600), chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap(), Map::new()));
        let positions = Arc::new(PositionManager::new(false, dec!(1_000_000_000)));
        let tracker = Arc::new(ExecutionTracker::new());
        let engine = Arc::new(OrderEngine::new(
            Arc::clone(&bus),
            broker,
            store,
            queue,
            positions,
            tracker,
            CommissionSchedule::default(),
            OrderEngineConfig::default(),
        ));
        (engine, bus)
    }

    fn signal(price: Decimal, quantity: Option<Decimal>) -> TradingSignal {
        TradingSignal::new(
            SignalAction::Buy,
            Symbol::new("005930"),
            0.7,
            Some(price),
            quantity,
            None,
            Map::new(),
            Utc::now(),
            "momentum",
        )
    }

    #[tokio::test]
    async fn signal_sizing_matches_s1_from_spec() {
        // S1 from spec.md §8: confidence 0.7, price 75_200, ample cash.
        let (engine, _bus) = engine();
        let balance = AccountBalance::new(dec!(100_000_000), dec!(100_000_000));
        let order = engine.build_order_from_signal(&signal(dec!(75_200), None), &balance).unwrap();
        assert_eq!(order.order_type, OrderType::Limit);
        assert!(order.quantity >= Decimal::ONE);
    }

    #[tokio::test]
    async fn explicit_signal_quantity_is_honored() {
        let (engine, _bus) = engine();
        let balance = AccountBalance::new(dec!(100_000_000), dec!(100_000_000));
        let order = engine
            .build_order_from_signal(&signal(dec!(75_200), Some(dec!(42))), &balance)
            .unwrap();
        assert_eq!(order.quantity, dec!(42));
    }

    #[tokio::test]
    async fn accept_signal_enqueues_and_submission_worker_places_it() {
        let (engine, _bus) = engine();
        let order_id = engine.accept_signal(&signal(dec!(75_200), Some(dec!(10)))).await.unwrap();
        assert!(engine.active_order(&order_id).is_some());

        let (tx, rx) = watch::channel(false);
        let worker_engine = Arc::clone(&engine);
        let handle = tokio::spawn(async move { worker_engine.run_submission_worker(rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tx.send(true);
        handle.await.unwrap();

        let order = engine.active_order(&order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Submitted);
    }

    #[tokio::test]
    async fn insufficient_cash_is_rejected_pretrade() {
        let (engine, _bus) = engine();
        let tiny_balance = AccountBalance::new(dec!(1), dec!(1));
        let order = engine.build_order_from_signal(&signal(dec!(75_200), Some(dec!(1000))), &tiny_balance).unwrap();
        let result = engine.validate_pretrade(order, dec!(75_200), &tiny_balance);
        assert!(matches!(result, Err(RiskRefused { reason: PreTradeCheck::InsufficientCash, .. })));
    }

    #[tokio::test]
    async fn fill_reconciliation_applies_to_order_and_position() {
        let (engine, _bus) = engine();
        let order_id = engine.accept_signal(&signal(dec!(75_200), Some(dec!(10)))).await.unwrap();
        engine.submit_one(engine.active_order(&order_id).unwrap()).await;

        let notice = crate::event::BrokerFillNotice {
            order_id: Some(order_id.clone()),
            broker_order_id: None,
            symbol: Symbol::new("005930"),
            side: Side::Buy,
            quantity: dec!(10),
            price: dec!(75_200),
            commission: Decimal::ZERO,
            timestamp: Utc::now(),
            broker_fill_id: Some("f1".to_string()),
        };
        engine.reconcile_fill(notice).await.unwrap();

        // Fully filled: order is removed from the active table.
        assert!(engine.active_order(&order_id).is_none());
        let position = engine.positions.snapshot(&Symbol::new("005930")).unwrap();
        assert_eq!(position.quantity, dec!(10));
    }
}
