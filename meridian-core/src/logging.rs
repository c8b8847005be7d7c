//! Structured logging setup, grounded on the teacher's `core/src/logging.rs`
//! (`tracing_subscriber::registry()` wired with an `EnvFilter`, a `fmt`
//! layer, and a custom noise-suppressing [`Layer`]). Here the noise source
//! is the heartbeat span the Event Bus enters on every tick rather than the
//! teacher's audit-replica span.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const HEARTBEAT_SPAN_NAME: &str = "event_bus_heartbeat";

pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(HeartbeatSpanFilter)
        .init()
}

pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .with(HeartbeatSpanFilter)
        .init()
}

struct HeartbeatSpanFilter;

impl<S> tracing_subscriber::layer::Layer<S> for HeartbeatSpanFilter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn event_enabled(
        &self,
        _: &tracing::Event<'_>,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> bool {
        match ctx.lookup_current() {
            Some(span) => span.name() != HEARTBEAT_SPAN_NAME,
            None => true,
        }
    }
}
