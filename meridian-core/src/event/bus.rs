//! The Event Bus (C1), per spec.md §4.1.
//!
//! Grounded on `examples/original_source/qb/engines/event_bus/core.py`'s
//! `EventBus`/`EnhancedEventBus` (publish/subscribe, metrics, dead-letter
//! bucket, circuit breaker) and on the teacher's worker-pool idiom in
//! `core/src/execution/builder.rs` (`tokio::sync::mpsc::unbounded_channel`
//! plus `tokio::task::JoinHandle`/`JoinError` to bound and supervise
//! concurrent work).

use super::{
    circuit_breaker::CircuitBreaker,
    filter::EventFilter,
    types::{Event, EventPayload, EventType},
};
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use meridian_instrument::EventPriority;
use parking_lot::RwLock;
use std::{
    collections::{hash_map::DefaultHasher, HashMap, VecDeque},
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, warn};
use uuid::Uuid;

/// A subscriber callback, per spec.md §4.1 "Subscription". Implementors
/// receive the already filter-matched [`Event`] and report whether
/// handling succeeded; failures feed the per-type circuit breaker.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event) -> Result<(), String>;
}

/// A boxed closure adapter, for subscribing without a named type.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&Event) -> Result<(), String> + Send + Sync,
{
    async fn handle(&self, event: &Event) -> Result<(), String> {
        (self.0)(event)
    }
}

struct Subscription {
    id: Uuid,
    component: String,
    filter: EventFilter,
    handler: Arc<dyn EventHandler>,
}

#[derive(Debug, Clone)]
pub struct EventBusConfig {
    pub max_workers: usize,
    pub batch_size: usize,
    pub batch_timeout: std::time::Duration,
    pub enable_circuit_breaker: bool,
    pub enable_dead_letter_queue: bool,
    pub failure_threshold: u32,
    pub failure_window: TimeDelta,
    pub cooldown: TimeDelta,
    pub dead_letter_capacity: usize,
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            batch_size: 16,
            batch_timeout: std::time::Duration::from_millis(50),
            enable_circuit_breaker: true,
            enable_dead_letter_queue: true,
            failure_threshold: 5,
            failure_window: TimeDelta::seconds(60),
            cooldown: TimeDelta::seconds(30),
            dead_letter_capacity: 1_000,
            channel_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub event: Event,
    pub reason: String,
    pub moved_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct TypeCounters {
    published: AtomicU64,
    received: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    expired: AtomicU64,
}

#[derive(Debug, Default)]
pub struct EventBusMetricsSnapshot {
    pub published: u64,
    pub received: u64,
    pub processed: u64,
    pub failed: u64,
    pub expired: u64,
    pub dead_letters: usize,
    pub dropped_low_priority: u64,
}

struct BusMetrics {
    totals: TypeCounters,
    by_type: RwLock<HashMap<EventType, Arc<TypeCounters>>>,
}

impl BusMetrics {
    fn new() -> Self {
        Self {
            totals: TypeCounters::default(),
            by_type: RwLock::new(HashMap::new()),
        }
    }

    fn counters_for(&self, event_type: EventType) -> Arc<TypeCounters> {
        if let Some(c) = self.by_type.read().get(&event_type) {
            return c.clone();
        }
        self.by_type
            .write()
            .entry(event_type)
            .or_insert_with(|| Arc::new(TypeCounters::default()))
            .clone()
    }
}

/// Central pub/sub dispatcher. One lock guards the subscription table, per
/// spec.md §5 ("Event Bus: one lock over the subscription table").
///
/// Dispatch runs over `max_workers` independent lanes rather than one
/// channel shared by every worker: `publish` routes each event to the lane
/// keyed by `(event_type, source)`, so every event from a given source for
/// a given type is delivered to the same worker in send order, per spec.md
/// §5's per-subscription ordering guarantee. Parallelism still comes from
/// distinct (event_type, source) pairs landing on different lanes.
pub struct EventBus {
    subscriptions: RwLock<HashMap<EventType, Vec<Subscription>>>,
    circuit_breakers: parking_lot::Mutex<HashMap<EventType, CircuitBreaker>>,
    dead_letters: parking_lot::Mutex<VecDeque<DeadLetter>>,
    metrics: BusMetrics,
    config: EventBusConfig,
    running: AtomicBool,
    lanes: Vec<mpsc::Sender<Event>>,
    dropped_low_priority: AtomicU64,
    receivers: AsyncMutex<Option<Vec<mpsc::Receiver<Event>>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("config", &self.config)
            .finish()
    }
}

impl EventBus {
    pub fn new(config: EventBusConfig) -> Arc<Self> {
        let lane_count = config.max_workers.max(1);
        let mut lanes = Vec::with_capacity(lane_count);
        let mut receivers = Vec::with_capacity(lane_count);
        for _ in 0..lane_count {
            let (tx, rx) = mpsc::channel(config.channel_capacity);
            lanes.push(tx);
            receivers.push(rx);
        }
        Arc::new(Self {
            subscriptions: RwLock::new(HashMap::new()),
            circuit_breakers: parking_lot::Mutex::new(HashMap::new()),
            dead_letters: parking_lot::Mutex::new(VecDeque::new()),
            metrics: BusMetrics::new(),
            config,
            running: AtomicBool::new(false),
            lanes,
            dropped_low_priority: AtomicU64::new(0),
            receivers: AsyncMutex::new(Some(receivers)),
        })
    }

    /// Picks the lane a given event's `(event_type, source)` pair is
    /// pinned to, so repeat publishes from the same source for the same
    /// type always serialize through the same worker.
    fn lane_for(&self, event: &Event) -> usize {
        let mut hasher = DefaultHasher::new();
        event.event_type.hash(&mut hasher);
        event.source.hash(&mut hasher);
        (hasher.finish() as usize) % self.lanes.len()
    }

    pub fn create_event(
        &self,
        source: impl Into<String>,
        data: EventPayload,
        priority: EventPriority,
        correlation_id: Option<String>,
        ttl: Option<TimeDelta>,
    ) -> Event {
        Event {
            event_id: Uuid::new_v4(),
            event_type: data.event_type(),
            source: source.into(),
            timestamp: Utc::now(),
            correlation_id,
            priority,
            ttl,
            data,
        }
    }

    /// Spawns one dispatch task per lane. Idempotent past the first call.
    pub fn run(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(receivers) = self.receivers.try_lock().and_then(|mut g| g.take()) else {
            return;
        };
        for (worker_id, receiver) in receivers.into_iter().enumerate() {
            let bus = Arc::clone(self);
            tokio::spawn(async move {
                bus.worker_loop(worker_id, receiver).await;
            });
        }
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Drains up to `batch_size` events from this lane, waiting at most
    /// `batch_timeout` past the first one, per spec.md §4.1's batched
    /// dispatch. Returns an empty batch only when the lane is closed.
    async fn next_batch(&self, receiver: &mut mpsc::Receiver<Event>) -> Vec<Event> {
        let Some(first) = receiver.recv().await else {
            return Vec::new();
        };
        let mut batch = vec![first];
        let deadline = tokio::time::Instant::now() + self.config.batch_timeout;
        while batch.len() < self.config.batch_size.max(1) {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, receiver.recv()).await {
                Ok(Some(event)) => batch.push(event),
                Ok(None) | Err(_) => break,
            }
        }
        batch
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize, mut receiver: mpsc::Receiver<Event>) {
        loop {
            if !self.running.load(Ordering::Relaxed) {
                return;
            }
            let batch = self.next_batch(&mut receiver).await;
            if batch.is_empty() {
                return;
            }
            debug!(worker_id, batch_len = batch.len(), "event bus dispatching batch");
            for event in batch {
                self.dispatch(event).await;
            }
        }
    }

    /// Enqueues `event` for dispatch. Returns `false` if the circuit
    /// breaker for `event.event_type` is open, the bus channel is
    /// closed, or (for `EventPriority::Low` only) the target lane is at
    /// capacity — per spec.md §5's backpressure requirement, LOW-priority
    /// events are dropped under load rather than blocking the publisher,
    /// while NORMAL/HIGH/CRITICAL publishes apply backpressure by
    /// awaiting channel space.
    pub async fn publish(&self, event: Event) -> bool {
        if self.config.enable_circuit_breaker {
            let mut breakers = self.circuit_breakers.lock();
            let breaker = breakers
                .entry(event.event_type)
                .or_insert_with(|| {
                    CircuitBreaker::new(
                        self.config.failure_threshold,
                        self.config.failure_window,
                        self.config.cooldown,
                    )
                });
            if !breaker.allow(Utc::now()) {
                warn!(event_type = ?event.event_type, "circuit breaker open, dropping publish");
                return false;
            }
        }

        let lane = self.lane_for(&event);
        let event_type = event.event_type;
        if event.priority == EventPriority::Low {
            return match self.lanes[lane].try_send(event) {
                Ok(()) => {
                    let counters = self.metrics.counters_for(event_type);
                    self.metrics.totals.published.fetch_add(1, Ordering::Relaxed);
                    counters.published.fetch_add(1, Ordering::Relaxed);
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.dropped_low_priority.fetch_add(1, Ordering::Relaxed);
                    warn!(event_type = ?event_type, "lane saturated, dropping low-priority event");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            };
        }

        let counters = self.metrics.counters_for(event_type);
        self.metrics.totals.published.fetch_add(1, Ordering::Relaxed);
        counters.published.fetch_add(1, Ordering::Relaxed);

        self.lanes[lane].send(event).await.is_ok()
    }

    async fn dispatch(&self, event: Event) {
        let counters = self.metrics.counters_for(event.event_type);
        self.metrics.totals.received.fetch_add(1, Ordering::Relaxed);
        counters.received.fetch_add(1, Ordering::Relaxed);

        if event.is_expired(Utc::now()) {
            self.metrics.totals.expired.fetch_add(1, Ordering::Relaxed);
            counters.expired.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let handlers: Vec<(String, Arc<dyn EventHandler>)> = {
            let subs = self.subscriptions.read();
            subs.get(&event.event_type)
                .map(|list| {
                    list.iter()
                        .filter(|s| s.filter.matches(&event))
                        .map(|s| (s.component.clone(), Arc::clone(&s.handler)))
                        .collect()
                })
                .unwrap_or_default()
        };

        if handlers.is_empty() {
            self.metrics.totals.processed.fetch_add(1, Ordering::Relaxed);
            counters.processed.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut any_failed = false;
        let mut last_error = String::new();
        for (component, handler) in handlers {
            let event_clone = event.clone();
            let outcome = tokio::spawn(async move { handler.handle(&event_clone).await }).await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    any_failed = true;
                    last_error = format!("{component}: {err}");
                }
                Err(join_err) => {
                    any_failed = true;
                    last_error = format!("{component}: handler panicked: {join_err}");
                }
            }
        }

        self.metrics.totals.processed.fetch_add(1, Ordering::Relaxed);
        counters.processed.fetch_add(1, Ordering::Relaxed);

        let now = Utc::now();
        if self.config.enable_circuit_breaker {
            let mut breakers = self.circuit_breakers.lock();
            let breaker = breakers
                .entry(event.event_type)
                .or_insert_with(|| {
                    CircuitBreaker::new(
                        self.config.failure_threshold,
                        self.config.failure_window,
                        self.config.cooldown,
                    )
                });
            if any_failed {
                breaker.record_failure(now);
            } else {
                breaker.record_success(now);
            }
        }

        if any_failed {
            self.metrics.totals.failed.fetch_add(1, Ordering::Relaxed);
            counters.failed.fetch_add(1, Ordering::Relaxed);
            if self.config.enable_dead_letter_queue {
                let mut dlq = self.dead_letters.lock();
                if dlq.len() >= self.config.dead_letter_capacity {
                    dlq.pop_front();
                }
                dlq.push_back(DeadLetter {
                    event,
                    reason: last_error,
                    moved_at: now,
                });
            }
        }
    }

    pub fn subscribe(
        &self,
        event_type: EventType,
        component: impl Into<String>,
        filter: EventFilter,
        handler: Arc<dyn EventHandler>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.subscriptions
            .write()
            .entry(event_type)
            .or_default()
            .push(Subscription {
                id,
                component: component.into(),
                filter,
                handler,
            });
        id
    }

    pub fn unsubscribe(&self, event_type: EventType, subscription_id: Uuid) -> bool {
        let mut subs = self.subscriptions.write();
        if let Some(list) = subs.get_mut(&event_type) {
            let before = list.len();
            list.retain(|s| s.id != subscription_id);
            return list.len() != before;
        }
        false
    }

    pub fn subscription_stats(&self) -> HashMap<EventType, usize> {
        self.subscriptions
            .read()
            .iter()
            .map(|(k, v)| (*k, v.len()))
            .collect()
    }

    pub fn get_metrics(&self) -> EventBusMetricsSnapshot {
        EventBusMetricsSnapshot {
            published: self.metrics.totals.published.load(Ordering::Relaxed),
            received: self.metrics.totals.received.load(Ordering::Relaxed),
            processed: self.metrics.totals.processed.load(Ordering::Relaxed),
            failed: self.metrics.totals.failed.load(Ordering::Relaxed),
            expired: self.metrics.totals.expired.load(Ordering::Relaxed),
            dead_letters: self.dead_letters.lock().len(),
            dropped_low_priority: self.dropped_low_priority.load(Ordering::Relaxed),
        }
    }

    pub fn health_check(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{super::types::StatusPayload, *};
    use std::sync::atomic::AtomicUsize;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: &Event) -> Result<(), String> {
            self.count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("boom".to_string())
            } else {
                Ok(())
            }
        }
    }

    fn heartbeat(bus: &EventBus) -> Event {
        bus.create_event(
            "engine",
            EventPayload::Heartbeat {
                component: "engine".into(),
            },
            EventPriority::Normal,
            None,
            None,
        )
    }

    #[tokio::test]
    async fn publish_dispatches_to_matching_subscribers() {
        let bus = EventBus::new(EventBusConfig::default());
        bus.run();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            EventType::Heartbeat,
            "probe",
            EventFilter::default(),
            Arc::new(CountingHandler {
                count: Arc::clone(&count),
                fail: false,
            }),
        );

        let event = heartbeat(&bus);
        assert!(bus.publish(event).await);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        let metrics = bus.get_metrics();
        assert_eq!(metrics.published, 1);
        assert_eq!(metrics.processed, 1);
        assert_eq!(metrics.failed, 0);
    }

    #[tokio::test]
    async fn failing_handler_is_dead_lettered() {
        let bus = EventBus::new(EventBusConfig::default());
        bus.run();
        bus.subscribe(
            EventType::Heartbeat,
            "probe",
            EventFilter::default(),
            Arc::new(CountingHandler {
                count: Arc::new(AtomicUsize::new(0)),
                fail: true,
            }),
        );

        let event = heartbeat(&bus);
        bus.publish(event).await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let metrics = bus.get_metrics();
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.dead_letters, 1);
    }

    #[tokio::test]
    async fn expired_event_is_dropped_before_dispatch() {
        let bus = EventBus::new(EventBusConfig::default());
        bus.run();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            EventType::Heartbeat,
            "probe",
            EventFilter::default(),
            Arc::new(CountingHandler {
                count: Arc::clone(&count),
                fail: false,
            }),
        );

        let mut event = heartbeat(&bus);
        event.timestamp = Utc::now() - TimeDelta::seconds(120);
        event.ttl = Some(TimeDelta::seconds(1));
        bus.publish(event).await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.get_metrics().expired, 1);
    }

    #[tokio::test]
    async fn unsubscribe_stops_future_dispatch() {
        let bus = EventBus::new(EventBusConfig::default());
        bus.run();
        let count = Arc::new(AtomicUsize::new(0));
        let id = bus.subscribe(
            EventType::Heartbeat,
            "probe",
            EventFilter::default(),
            Arc::new(CountingHandler {
                count: Arc::clone(&count),
                fail: false,
            }),
        );
        assert!(bus.unsubscribe(EventType::Heartbeat, id));

        bus.publish(heartbeat(&bus)).await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    struct OrderRecordingHandler(Arc<parking_lot::Mutex<Vec<u32>>>);

    #[async_trait]
    impl EventHandler for OrderRecordingHandler {
        async fn handle(&self, event: &Event) -> Result<(), String> {
            if let EventPayload::SystemStatus(status) = &event.data {
                if let Some(seq) = status.details.get("seq").and_then(|s| s.parse().ok()) {
                    self.0.lock().push(seq);
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn same_source_events_are_dispatched_in_send_order() {
        let bus = EventBus::new(EventBusConfig::default());
        bus.run();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        bus.subscribe(
            EventType::SystemStatus,
            "probe",
            EventFilter::default(),
            Arc::new(OrderRecordingHandler(Arc::clone(&seen))),
        );

        for seq in 0..20u32 {
            let mut details = HashMap::new();
            details.insert("seq".to_string(), seq.to_string());
            let event = bus.create_event(
                "same-source",
                EventPayload::SystemStatus(StatusPayload {
                    component: "probe".into(),
                    status: "ok".into(),
                    details,
                }),
                EventPriority::Normal,
                None,
                None,
            );
            assert!(bus.publish(event).await);
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert_eq!(seen.lock().clone(), (0..20u32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn low_priority_event_is_dropped_when_lane_saturated() {
        let mut config = EventBusConfig::default();
        config.max_workers = 1;
        config.channel_capacity = 1;
        let bus = EventBus::new(config);
        // Lane intentionally not started so the single-slot channel fills.

        let fill = bus.create_event(
            "flooder",
            EventPayload::Heartbeat { component: "flooder".into() },
            EventPriority::Low,
            None,
            None,
        );
        assert!(bus.publish(fill).await);

        let overflow = bus.create_event(
            "flooder",
            EventPayload::Heartbeat { component: "flooder".into() },
            EventPriority::Low,
            None,
            None,
        );
        assert!(!bus.publish(overflow).await);
        assert_eq!(bus.get_metrics().dropped_low_priority, 1);
    }
}
