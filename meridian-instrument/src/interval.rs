use serde::{Deserialize, Serialize};
use std::fmt;

/// The candle interval a [`crate::Symbol`]'s market data bar represents,
/// e.g. `"1m"`, `"5m"`, `"1d"`. Kept as a thin wrapper rather than a closed
/// enum since the set of supported intervals is a market-data-source
/// concern, not something the core pipeline constrains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct IntervalType(String);

impl IntervalType {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn one_minute() -> Self {
        Self::new("1m")
    }

    pub fn five_minutes() -> Self {
        Self::new("5m")
    }

    pub fn one_day() -> Self {
        Self::new("1d")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_one_minute(&self) -> bool {
        self.0 == "1m"
    }
}

impl fmt::Display for IntervalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IntervalType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
