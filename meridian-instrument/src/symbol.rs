use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// A ticker symbol, e.g. `"005930"` or `"AAPL"`.
///
/// Backed by [`SmolStr`] so short symbols (the overwhelming majority) never
/// allocate, matching the teacher ecosystem's use of `smol_str` for
/// instrument identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct Symbol(SmolStr);

impl Symbol {
    pub fn new(value: impl Into<SmolStr>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
