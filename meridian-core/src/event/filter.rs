//! `EventFilter`, the conjunction of subscription clauses, per spec.md
//! §4.1 "Delivery": "a subscriber may additionally filter on source and
//! minimum priority; all present clauses must match".

use super::types::{Event, EventType};
use meridian_instrument::EventPriority;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_types: Option<HashSet<EventType>>,
    pub sources: Option<HashSet<String>>,
    pub min_priority: Option<EventPriority>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(types) = &self.event_types {
            if !types.contains(&event.event_type) {
                return false;
            }
        }
        if let Some(sources) = &self.sources {
            if !sources.contains(&event.source) {
                return false;
            }
        }
        if let Some(min) = self.min_priority {
            if event.priority < min {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::types::EventPayload;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(priority: EventPriority, source: &str) -> Event {
        Event {
            event_id: Uuid::new_v4(),
            event_type: EventType::Heartbeat,
            source: source.to_string(),
            timestamp: Utc::now(),
            correlation_id: None,
            priority,
            ttl: None,
            data: EventPayload::Heartbeat {
                component: source.to_string(),
            },
        }
    }

    #[test]
    fn all_present_clauses_must_match() {
        let filter = EventFilter {
            event_types: Some([EventType::Heartbeat].into_iter().collect()),
            sources: Some(["engine".to_string()].into_iter().collect()),
            min_priority: Some(EventPriority::Normal),
        };
        assert!(filter.matches(&event(EventPriority::High, "engine")));
        assert!(!filter.matches(&event(EventPriority::High, "other")));
        assert!(!filter.matches(&event(EventPriority::Low, "engine")));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = EventFilter::default();
        assert!(filter.matches(&event(EventPriority::Low, "anything")));
    }
}
