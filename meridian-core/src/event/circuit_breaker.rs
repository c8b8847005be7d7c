//! Per-`EventType` circuit breaker, per spec.md §4.1 "Circuit breaker":
//! "after `failure_threshold` consecutive dispatch failures for a given
//! event type within `failure_window`, the bus stops dispatching that
//! event type (`OPEN`) for `cooldown`; the next publish after cooldown is
//! admitted as a single probe (`HALF_OPEN`) — success closes the breaker,
//! failure reopens it and restarts the cooldown."
//!
//! The original `qb.engines.event_bus.core.CircuitBreaker` is an empty
//! stub (`def __init__(self): pass`), so this state machine is built
//! directly from the textual contract above rather than transliterated.

use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: CircuitState,
    consecutive_failures: u32,
    failure_threshold: u32,
    failure_window: TimeDelta,
    cooldown: TimeDelta,
    first_failure_at: Option<DateTime<Utc>>,
    opened_at: Option<DateTime<Utc>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, failure_window: TimeDelta, cooldown: TimeDelta) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            failure_threshold,
            failure_window,
            cooldown,
            first_failure_at: None,
            opened_at: None,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Whether a publish for this event type may proceed right now. Moves
    /// `OPEN` to `HALF_OPEN` once `cooldown` has elapsed, admitting exactly
    /// one probe.
    pub fn allow(&mut self, now: DateTime<Utc>) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => false,
            CircuitState::Open => {
                let opened_at = self.opened_at.expect("open state always has opened_at");
                if now - opened_at >= self.cooldown {
                    self.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&mut self, _now: DateTime<Utc>) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.first_failure_at = None;
        self.opened_at = None;
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        if self.state == CircuitState::HalfOpen {
            self.open(now);
            return;
        }

        match self.first_failure_at {
            Some(first) if now - first <= self.failure_window => {
                self.consecutive_failures += 1;
            }
            _ => {
                self.first_failure_at = Some(now);
                self.consecutive_failures = 1;
            }
        }

        if self.consecutive_failures >= self.failure_threshold {
            self.open(now);
        }
    }

    fn open(&mut self, now: DateTime<Utc>) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(offset_secs: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-07-26T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + TimeDelta::seconds(offset_secs)
    }

    #[test]
    fn opens_after_threshold_consecutive_failures_within_window() {
        let mut cb = CircuitBreaker::new(3, TimeDelta::seconds(60), TimeDelta::seconds(30));
        assert!(cb.allow(t(0)));
        cb.record_failure(t(0));
        cb.record_failure(t(1));
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure(t(2));
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow(t(3)));
    }

    #[test]
    fn half_open_probe_succeeds_closes_breaker() {
        let mut cb = CircuitBreaker::new(2, TimeDelta::seconds(60), TimeDelta::seconds(10));
        cb.record_failure(t(0));
        cb.record_failure(t(1));
        assert_eq!(cb.state(), CircuitState::Open);

        assert!(!cb.allow(t(5)));
        assert!(cb.allow(t(12)));
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_success(t(12));
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow(t(13)));
    }

    #[test]
    fn half_open_probe_failure_reopens_and_restarts_cooldown() {
        let mut cb = CircuitBreaker::new(1, TimeDelta::seconds(60), TimeDelta::seconds(10));
        cb.record_failure(t(0));
        assert_eq!(cb.state(), CircuitState::Open);

        assert!(cb.allow(t(11)));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_failure(t(11));
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow(t(15)));
        assert!(cb.allow(t(22)));
    }

    #[test]
    fn failures_outside_window_do_not_accumulate() {
        let mut cb = CircuitBreaker::new(2, TimeDelta::seconds(5), TimeDelta::seconds(10));
        cb.record_failure(t(0));
        cb.record_failure(t(20));
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
