use serde::{Deserialize, Serialize};

/// Trade direction. `1` for [`Side::Buy`], `-1` for [`Side::Sell`] — used
/// throughout position arithmetic as the signed multiplier `s` from
/// spec.md §4.3.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The signed multiplier applied to a fill quantity to obtain `Δ`.
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}
