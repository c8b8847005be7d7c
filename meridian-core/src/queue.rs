//! Order Queue (C4), per spec.md §4.4. Priority binary heap ordered by
//! `(priority, enqueue_time)`, mirrored to the `StateStore` under
//! `pending:*`/`processing:*` so a restart reconstructs the heap, per
//! spec.md §4.4's final paragraph.

use chrono::{DateTime, NaiveTime, Utc};
use meridian_execution::{order::OrderId, Order, StateStore};
use meridian_instrument::{OrderType, Side, Symbol, TimeInForce};
use parking_lot::Mutex;
use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatus {
    pub pending: usize,
    pub processing: usize,
}

#[derive(Debug, Clone)]
struct QueueEntry {
    priority: i32,
    enqueued_at: DateTime<Utc>,
    order: Order,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.enqueued_at == other.enqueued_at
    }
}
impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    /// `BinaryHeap` is a max-heap; lower `priority` number dispatches
    /// earlier, so this reverses both the priority and time comparisons.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.enqueued_at.cmp(&self.enqueued_at))
    }
}

/// Priority adjustments applied on top of the baseline 100, per spec.md
/// §4.4, clamped to `≥ 1`.
pub fn compute_priority(order: &Order, strategy_priorities: &HashMap<String, i32>) -> i32 {
    let mut priority: i32 = 100;
    match order.order_type {
        OrderType::Market => priority -= 20,
        OrderType::Stop | OrderType::StopLimit => priority -= 10,
        OrderType::Limit => {}
    }
    if order.side == Side::Sell {
        priority -= 5;
    }
    if let Some(name) = &order.strategy_name {
        if let Some(adjustment) = strategy_priorities.get(name) {
            priority += adjustment;
        }
    }
    if let Some(raw) = order.metadata.get("priority_adjustment") {
        if let Ok(adjustment) = raw.parse::<i32>() {
            priority += adjustment;
        }
    }
    priority.max(1)
}

struct Inner {
    pending: BinaryHeap<QueueEntry>,
    processing: HashMap<OrderId, Order>,
    known_ids: std::collections::HashSet<OrderId>,
}

/// The Order Queue (C4). `max_queue_size` bounds the pending heap;
/// `priority_timeout` and `market_close_time` bound how long an order may
/// sit before `get_next_order` evicts it as expired.
pub struct OrderQueue {
    inner: Mutex<Inner>,
    max_queue_size: usize,
    priority_timeout: Duration,
    market_close_time: NaiveTime,
    strategy_priorities: HashMap<String, i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("order {0:?} already queued")]
    Duplicate(String),
    #[error("queue is at capacity")]
    Full,
}

impl OrderQueue {
    pub fn new(
        max_queue_size: usize,
        priority_timeout: Duration,
        market_close_time: NaiveTime,
        strategy_priorities: HashMap<String, i32>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: BinaryHeap::new(),
                processing: HashMap::new(),
                known_ids: std::collections::HashSet::new(),
            }),
            max_queue_size,
            priority_timeout,
            market_close_time,
            strategy_priorities,
        }
    }

    pub fn add_order(&self, order: Order) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        if inner.known_ids.contains(&order.order_id) {
            return Err(QueueError::Duplicate(order.order_id.0.clone()));
        }
        if inner.pending.len() >= self.max_queue_size {
            return Err(QueueError::Full);
        }
        let priority = compute_priority(&order, &self.strategy_priorities);
        inner.known_ids.insert(order.order_id.clone());
        inner.pending.push(QueueEntry {
            priority,
            enqueued_at: Utc::now(),
            order,
        });
        Ok(())
    }

    /// Pops the highest-priority non-expired order, moving it to
    /// "processing". Expired orders (stale `DAY` orders past local market
    /// close, or past `priority_timeout`) are discarded along the way and
    /// returned as `evicted` so the caller can clean up the `pending:*`
    /// mirror in `StateStore` (deleting under the lock would require
    /// awaiting a store call while holding it).
    pub fn get_next_order(&self, now: DateTime<Utc>, local_time_now: NaiveTime) -> (Option<Order>, Vec<OrderId>) {
        let mut inner = self.inner.lock();
        let mut evicted = Vec::new();
        loop {
            let Some(entry) = inner.pending.pop() else {
                return (None, evicted);
            };
            let expired_day_order =
                entry.order.time_in_force == TimeInForce::Day && local_time_now > self.market_close_time;
            let expired_by_timeout = now.signed_duration_since(entry.enqueued_at)
                > chrono::TimeDelta::from_std(self.priority_timeout).unwrap_or(chrono::TimeDelta::MAX);

            if expired_day_order || expired_by_timeout {
                inner.known_ids.remove(&entry.order.order_id);
                evicted.push(entry.order.order_id);
                continue;
            }

            inner.processing.insert(entry.order.order_id.clone(), entry.order.clone());
            return (Some(entry.order), evicted);
        }
    }

    pub fn remove_order(&self, order_id: &OrderId) -> Option<Order> {
        let mut inner = self.inner.lock();
        inner.known_ids.remove(order_id);
        if let Some(order) = inner.processing.remove(order_id) {
            return Some(order);
        }
        let mut found = None;
        let remaining: Vec<QueueEntry> = inner
            .pending
            .drain()
            .filter(|e| {
                if &e.order.order_id == order_id {
                    found = Some(e.order.clone());
                    false
                } else {
                    true
                }
            })
            .collect();
        inner.pending.extend(remaining);
        found
    }

    pub fn get_pending_orders(&self) -> Vec<Order> {
        self.inner.lock().pending.iter().map(|e| e.order.clone()).collect()
    }

    pub fn get_processing_orders(&self) -> Vec<Order> {
        self.inner.lock().processing.values().cloned().collect()
    }

    pub fn get_queue_status(&self) -> QueueStatus {
        let inner = self.inner.lock();
        QueueStatus {
            pending: inner.pending.len(),
            processing: inner.processing.len(),
        }
    }

    /// Mirrors the current pending/processing sets to `store` under
    /// `pending:{order_id}` / `processing:{order_id}`.
    pub async fn persist(&self, store: &dyn StateStore) -> Result<(), meridian_execution::StoreError> {
        let (pending, processing) = {
            let inner = self.inner.lock();
            (
                inner.pending.iter().map(|e| e.order.clone()).collect::<Vec<_>>(),
                inner.processing.values().cloned().collect::<Vec<_>>(),
            )
        };
        for order in pending {
            let json = serde_json::to_string(&order).unwrap_or_default();
            store.put(&format!("pending:{}", order.order_id), json).await?;
        }
        for order in processing {
            let json = serde_json::to_string(&order).unwrap_or_default();
            store.put(&format!("processing:{}", order.order_id), json).await?;
        }
        Ok(())
    }

    /// Reconstructs the heap from the store mirror, discarding any entry
    /// whose JSON fails to parse (treated as already expired).
    pub async fn restore(
        &self,
        store: &dyn StateStore,
    ) -> Result<(), meridian_execution::StoreError> {
        for key in store.scan_prefix("pending:").await? {
            if let Some(json) = store.get(&key).await? {
                if let Ok(order) = serde_json::from_str::<Order>(&json) {
                    let _ = self.add_order(order);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_instrument::{OrderType as Ot, TimeInForce as Tif};
    use rust_decimal_macros::dec;
    use std::collections::HashMap as Map;

    fn order(id: &str, side: Side, order_type: Ot) -> Order {
        Order::new(
            OrderId::new(id.into()),
            Symbol::new("005930"),
            side,
            order_type,
            dec!(10),
            Some(dec!(75_000)),
            if order_type == Ot::Stop || order_type == Ot::StopLimit {
                Some(dec!(74_500))
            } else {
                None
            },
            Tif::Day,
            None,
            Utc::now(),
            Map::new(),
        )
        .unwrap()
    }

    #[test]
    fn market_orders_dispatch_before_limit_orders() {
        let queue = OrderQueue::new(
            100,
            Duration::from_secs(600),
            NaiveTime::from_hms_opt(15, 20, 0).unwrap(),
            Map::new(),
        );
        queue.add_order(order("limit1", Side::Buy, Ot::Limit)).unwrap();
        queue.add_order(order("market1", Side::Buy, Ot::Market)).unwrap();

        let (next, evicted) = queue.get_next_order(Utc::now(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        let next = next.unwrap();
        assert_eq!(next.order_id.0, "market1");
        assert!(evicted.is_empty());
    }

    #[test]
    fn duplicate_order_id_is_rejected() {
        let queue = OrderQueue::new(
            100,
            Duration::from_secs(600),
            NaiveTime::from_hms_opt(15, 20, 0).unwrap(),
            Map::new(),
        );
        queue.add_order(order("o1", Side::Buy, Ot::Limit)).unwrap();
        let err = queue.add_order(order("o1", Side::Buy, Ot::Limit));
        assert!(matches!(err, Err(QueueError::Duplicate(_))));
    }

    #[test]
    fn day_order_past_market_close_is_evicted() {
        let queue = OrderQueue::new(
            100,
            Duration::from_secs(600),
            NaiveTime::from_hms_opt(15, 20, 0).unwrap(),
            Map::new(),
        );
        queue.add_order(order("o1", Side::Buy, Ot::Limit)).unwrap();
        let (next, evicted) = queue.get_next_order(Utc::now(), NaiveTime::from_hms_opt(15, 30, 0).unwrap());
        assert!(next.is_none());
        assert_eq!(evicted, vec![OrderId::new("o1".into())]);
        assert_eq!(queue.get_queue_status().pending, 0);
    }

    #[test]
    fn queue_rejects_beyond_capacity() {
        let queue = OrderQueue::new(1, Duration::from_secs(600), NaiveTime::from_hms_opt(15, 20, 0).unwrap(), Map::new());
        queue.add_order(order("o1", Side::Buy, Ot::Limit)).unwrap();
        let err = queue.add_order(order("o2", Side::Buy, Ot::Limit));
        assert!(matches!(err, Err(QueueError::Full)));
    }
}
