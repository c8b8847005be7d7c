//! The engine's configuration surface, per spec.md §6.5. Grounded on the
//! teacher's `core/src/system/config.rs` builder style: one struct per
//! component, aggregated into a single top-level config the system builder
//! consumes.

use crate::event::EventBusConfig;
use meridian_risk::CommissionSchedule;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OrderEngineConfig {
    pub max_order_value: Decimal,
    pub max_position_count: usize,
    pub order_timeout: Duration,
    pub enable_partial_fills: bool,
    pub min_order_quantity: Decimal,
    pub max_order_quantity: Decimal,
}

impl Default for OrderEngineConfig {
    fn default() -> Self {
        Self {
            max_order_value: Decimal::new(10_000_000, 0),
            max_position_count: 20,
            order_timeout: Duration::from_secs(300),
            enable_partial_fills: true,
            min_order_quantity: Decimal::ONE,
            max_order_quantity: Decimal::new(1_000_000, 0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderQueueConfig {
    pub max_queue_size: usize,
    pub max_concurrent_orders: usize,
    pub priority_timeout: Duration,
    /// Per-strategy priority adjustment, added to the baseline priority
    /// score before the type/side adjustments (spec.md §4.4).
    pub strategy_priorities: HashMap<String, i32>,
}

impl Default for OrderQueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 1_000,
            max_concurrent_orders: 50,
            priority_timeout: Duration::from_secs(600),
            strategy_priorities: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionManagerConfig {
    pub enable_short_selling: bool,
    pub position_size_limit: Decimal,
}

impl Default for PositionManagerConfig {
    fn default() -> Self {
        Self {
            enable_short_selling: false,
            position_size_limit: Decimal::new(100_000_000, 0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionMonitorConfig {
    pub max_fill_delay: Duration,
    pub max_partial_fill_time: Duration,
    pub unusual_price_threshold: Decimal,
    pub min_fill_size: Decimal,
    pub max_fills_per_order: usize,
}

impl Default for ExecutionMonitorConfig {
    fn default() -> Self {
        Self {
            max_fill_delay: Duration::from_secs(60),
            max_partial_fill_time: Duration::from_secs(600),
            unusual_price_threshold: Decimal::new(20, 2), // 20% deviation
            min_fill_size: Decimal::new(1, 0),
            max_fills_per_order: 50,
        }
    }
}

/// Aggregates every option spec.md §6.5 enumerates. `strategy_plugin_dir`
/// is carried for fidelity with the original's disk-discovered plug-in
/// directory but unused: hot reload from disk is explicitly out of scope
/// (spec.md §9) for a compiled target whose strategies are linked in via
/// [`meridian_strategy::StrategyLoader::register`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub order_engine: OrderEngineConfig,
    pub order_queue: OrderQueueConfig,
    pub position_manager: PositionManagerConfig,
    pub commission: CommissionSchedule,
    pub event_bus: EventBusConfig,
    pub execution_monitor: ExecutionMonitorConfig,
    pub strategy_plugin_dir: Option<String>,
}
