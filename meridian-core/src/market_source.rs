//! The `MarketDataSource` capability (consumed), per spec.md §6.2: "the
//! engine treats the source as opaque: whether it comes from a WebSocket,
//! file replay, or simulator." Unlike [`meridian_execution::BrokerAdapter`],
//! this collaborator is not called into — it drives the bus itself,
//! publishing `MARKET_DATA_RECEIVED` (and, optionally, `INDICATORS_UPDATED`)
//! events until cancelled.

use crate::event::{Event, EventBus};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Runs until `shutdown` fires, publishing events onto `bus`.
    async fn run(&self, bus: Arc<EventBus>, shutdown: watch::Receiver<bool>);
}

/// A scriptable source replaying a fixed sequence of events at a fixed
/// cadence, for deterministic tests and the `demos` crate — mirrors
/// [`meridian_execution::MockBrokerAdapter`]'s role on the broker side.
pub struct ScriptedMarketDataSource {
    events: parking_lot::Mutex<Vec<Event>>,
    tick_interval: std::time::Duration,
}

impl ScriptedMarketDataSource {
    pub fn new(events: Vec<Event>, tick_interval: std::time::Duration) -> Self {
        Self {
            events: parking_lot::Mutex::new(events),
            tick_interval,
        }
    }
}

#[async_trait]
impl MarketDataSource for ScriptedMarketDataSource {
    async fn run(&self, bus: Arc<EventBus>, mut shutdown: watch::Receiver<bool>) {
        let events = std::mem::take(&mut *self.events.lock());
        for event in events {
            if *shutdown.borrow() {
                return;
            }
            bus.publish(event).await;
            tokio::select! {
                _ = tokio::time::sleep(self.tick_interval) => {}
                _ = shutdown.changed() => return,
            }
        }
    }
}
