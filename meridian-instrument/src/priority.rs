use serde::{Deserialize, Serialize};

/// Event delivery priority, per spec.md §3 `Event`.
///
/// Ordered so that `EventPriority::Low < EventPriority::Critical`: the Event
/// Bus backpressure policy (spec.md §5) drops `Low` events first when the
/// dispatch backlog exceeds its high-water mark.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum EventPriority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for EventPriority {
    fn default() -> Self {
        EventPriority::Normal
    }
}
