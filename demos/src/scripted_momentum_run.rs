//! Wires a full [`Engine`] against [`MockBrokerAdapter`], [`InMemoryStateStore`]
//! and a [`ScriptedMarketDataSource`] replaying a short rising-then-falling
//! price series, so the moving-average momentum strategy both buys and
//! sells over the course of one run.

use chrono::Utc;
use meridian_core::{
    event::{Event, EventPayload},
    Engine, EngineConfig, ScriptedMarketDataSource,
};
use meridian_execution::{store::InMemoryStateStore, AccountBalance, MockBrokerAdapter};
use meridian_instrument::{EventPriority, IntervalType, Symbol};
use meridian_strategy::{MarketData, MovingAverageMomentum, StrategyLoader};
use rust_decimal_macros::dec;
use std::{collections::HashMap, sync::Arc, time::Duration};
use uuid::Uuid;

fn bar(symbol: &Symbol, close: rust_decimal::Decimal, sma_5: rust_decimal::Decimal) -> Event {
    let mut indicators = HashMap::new();
    indicators.insert("sma_5".to_string(), sma_5);
    indicators.insert("avg_volume_5d".to_string(), dec!(40_000_000_000));
    let market_data = MarketData {
        symbol: symbol.clone(),
        timestamp: Utc::now(),
        open: close,
        high: close,
        low: close,
        close,
        volume: dec!(1_000_000),
        interval_type: IntervalType::one_minute(),
        indicators,
    };
    Event {
        event_id: Uuid::new_v4(),
        event_type: meridian_core::EventType::MarketDataReceived,
        source: "scripted_momentum_run".to_string(),
        timestamp: Utc::now(),
        correlation_id: None,
        priority: EventPriority::Normal,
        ttl: None,
        data: EventPayload::MarketData(market_data),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let symbol = Symbol::new("005930");
    let prices: Vec<rust_decimal::Decimal> = vec![
        dec!(70_000),
        dec!(70_500),
        dec!(71_200),
        dec!(72_800),
        dec!(74_500),
        dec!(76_000),
        dec!(75_000),
        dec!(73_000),
        dec!(71_500),
        dec!(70_200),
    ];
    let events: Vec<Event> = prices
        .iter()
        .enumerate()
        .map(|(i, price)| {
            let window = &prices[i.saturating_sub(4)..=i];
            let sma_5 =
                window.iter().sum::<rust_decimal::Decimal>() / rust_decimal::Decimal::from(window.len() as u64);
            bar(&symbol, *price, sma_5)
        })
        .collect();
    let source = Arc::new(ScriptedMarketDataSource::new(events, Duration::from_millis(200)));

    let loader = Arc::new(StrategyLoader::new());
    loader
        .register("momentum", Box::new(MovingAverageMomentum::default()))
        .expect("register momentum strategy");
    loader
        .activate_strategy_for_symbols("momentum", [symbol.clone()].into_iter().collect())
        .expect("activate momentum strategy");

    let broker = Arc::new(MockBrokerAdapter::new(AccountBalance::new(
        dec!(100_000_000),
        dec!(100_000_000),
    )));
    let store = Arc::new(InMemoryStateStore::new());

    let engine = Engine::build(EngineConfig::default(), broker, store, loader);
    engine.start(Some(source as Arc<dyn meridian_core::MarketDataSource>));

    tokio::time::sleep(Duration::from_secs(3)).await;

    println!("final position: {:?}", engine.positions.snapshot(&symbol));
    println!("queue status: {:?}", engine.queue.get_queue_status());
    println!("active orders: {}", engine.order_engine.active_order_count());

    engine.shutdown().await;
}
