//! Event, EventType, and the discriminated payload union, per spec.md §3
//! "Event"/"EventType" and §9's redesign note: "each `EventType` names a
//! concrete payload record; the bus stores a discriminated union. Handlers
//! receive the discriminated enum and pattern-match" (replacing the
//! original's untyped `data: dict`).

use chrono::{DateTime, TimeDelta, Utc};
use meridian_execution::{order::OrderId, OrderResult};
use meridian_instrument::{EventPriority, Side};
use meridian_strategy::TradingSignal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The closed tag set partitioning payload schemas, per spec.md §3.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum EventType {
    MarketDataReceived,
    CandleUpdated,
    IndicatorsUpdated,
    TradingSignal,
    OrderPlaced,
    OrderExecuted,
    OrderPartiallyExecuted,
    OrderFullyExecuted,
    OrderCancelled,
    OrderFailed,
    PositionUpdated,
    RiskAlert,
    EmergencyStop,
    EngineStarted,
    EngineStopped,
    SystemStatus,
    SystemError,
    Heartbeat,
    StalePartialFillAlert,
}

/// Payload carried by an inbound `ORDER_EXECUTED` broker notification,
/// per spec.md §6.1: `{order_id | broker_order_id, symbol, side, quantity,
/// price, timestamp, broker_fill_id?}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BrokerFillNotice {
    pub order_id: Option<OrderId>,
    pub broker_order_id: Option<String>,
    pub symbol: meridian_instrument::Symbol,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub commission: Decimal,
    pub timestamp: DateTime<Utc>,
    pub broker_fill_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderPlacedPayload {
    pub order_id: OrderId,
    pub broker_order_id: String,
    pub symbol: meridian_instrument::Symbol,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderProgressPayload {
    pub order_id: OrderId,
    pub symbol: meridian_instrument::Symbol,
    pub filled_quantity: Decimal,
    pub average_fill_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderTerminalPayload {
    pub order_id: OrderId,
    pub reason: String,
    pub result: Option<OrderResult>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PositionUpdatedPayload {
    pub symbol: meridian_instrument::Symbol,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StatusPayload {
    pub component: String,
    pub status: String,
    pub details: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorPayload {
    pub component: String,
    pub error_type: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AlertPayload {
    pub order_id: Option<OrderId>,
    pub symbol: Option<meridian_instrument::Symbol>,
    pub message: String,
}

/// The discriminated event payload union.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum EventPayload {
    MarketData(meridian_strategy::MarketData),
    IndicatorsUpdated {
        symbol: meridian_instrument::Symbol,
        indicators: HashMap<String, Decimal>,
    },
    TradingSignal(TradingSignal),
    OrderPlaced(OrderPlacedPayload),
    OrderExecuted(BrokerFillNotice),
    OrderPartiallyExecuted(OrderProgressPayload),
    OrderFullyExecuted(OrderProgressPayload),
    OrderCancelled(OrderTerminalPayload),
    OrderFailed(OrderTerminalPayload),
    PositionUpdated(PositionUpdatedPayload),
    RiskAlert(AlertPayload),
    EmergencyStop {
        reason: String,
    },
    EngineStarted,
    EngineStopped,
    SystemStatus(StatusPayload),
    SystemError(ErrorPayload),
    Heartbeat {
        component: String,
    },
    StalePartialFillAlert(AlertPayload),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::MarketData(_) => EventType::MarketDataReceived,
            EventPayload::IndicatorsUpdated { .. } => EventType::IndicatorsUpdated,
            EventPayload::TradingSignal(_) => EventType::TradingSignal,
            EventPayload::OrderPlaced(_) => EventType::OrderPlaced,
            EventPayload::OrderExecuted(_) => EventType::OrderExecuted,
            EventPayload::OrderPartiallyExecuted(_) => EventType::OrderPartiallyExecuted,
            EventPayload::OrderFullyExecuted(_) => EventType::OrderFullyExecuted,
            EventPayload::OrderCancelled(_) => EventType::OrderCancelled,
            EventPayload::OrderFailed(_) => EventType::OrderFailed,
            EventPayload::PositionUpdated(_) => EventType::PositionUpdated,
            EventPayload::RiskAlert(_) => EventType::RiskAlert,
            EventPayload::EmergencyStop { .. } => EventType::EmergencyStop,
            EventPayload::EngineStarted => EventType::EngineStarted,
            EventPayload::EngineStopped => EventType::EngineStopped,
            EventPayload::SystemStatus(_) => EventType::SystemStatus,
            EventPayload::SystemError(_) => EventType::SystemError,
            EventPayload::Heartbeat { .. } => EventType::Heartbeat,
            EventPayload::StalePartialFillAlert(_) => EventType::StalePartialFillAlert,
        }
    }
}

/// An immutable unit of dispatch, per spec.md §3 "Event". Lifetime ends at
/// dispatch completion or move to the dead-letter bucket.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Event {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<String>,
    pub priority: EventPriority,
    pub ttl: Option<TimeDelta>,
    pub data: EventPayload,
}

impl Event {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => now - self.timestamp > ttl,
            None => false,
        }
    }
}
