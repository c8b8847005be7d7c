//! Maximum drawdown tracking.
//!
//! Grounded on the doc example in
//! `examples/brbtavares-tucano/analytics/src/metric/mod.rs` (a
//! `DrawdownGenerator` fed a running equity value that emits a drawdown once
//! the curve recovers above its prior peak) and the cumulative-return
//! max-drawdown formula in
//! `examples/original_source/qb/engines/strategy_engine/performance.py`
//! (`_recalculate_strategy_metrics`: running peak over cumulative returns,
//! drawdown = (cumulative - peak) / (1 + peak)).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The largest peak-to-trough decline observed, as a non-positive fraction
/// of the peak (e.g. `-0.12` for a 12% drawdown).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
pub struct MaxDrawdown {
    pub value: Decimal,
}

/// Streaming max-drawdown tracker over a cumulative-return curve.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MaxDrawdownGenerator {
    running_peak: Decimal,
    max_drawdown: Decimal,
    peak_time: DateTime<Utc>,
}

impl MaxDrawdownGenerator {
    pub fn init(time: DateTime<Utc>) -> Self {
        Self {
            running_peak: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            peak_time: time,
        }
    }

    /// Feeds the next cumulative-return observation, updating the running
    /// peak and the maximum drawdown observed so far.
    pub fn update(&mut self, cumulative_return: Decimal, time: DateTime<Utc>) -> MaxDrawdown {
        if cumulative_return > self.running_peak {
            self.running_peak = cumulative_return;
            self.peak_time = time;
        }

        let denominator = Decimal::ONE + self.running_peak;
        if !denominator.is_zero() {
            let drawdown = (cumulative_return - self.running_peak) / denominator;
            if drawdown < self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }

        MaxDrawdown {
            value: self.max_drawdown,
        }
    }

    pub fn generate(&self) -> MaxDrawdown {
        MaxDrawdown {
            value: self.max_drawdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tracks_peak_to_trough_decline() {
        let t0 = DateTime::<Utc>::MIN_UTC;
        let mut gen = MaxDrawdownGenerator::init(t0);

        gen.update(dec!(0.10), t0);
        let dd = gen.update(dec!(-0.02), t0);
        assert!(dd.value < Decimal::ZERO);

        let recovered = gen.update(dec!(0.20), t0);
        // max drawdown persists even after recovery above the prior peak
        assert_eq!(recovered.value, dd.value);
    }

    #[test]
    fn flat_curve_has_no_drawdown() {
        let t0 = DateTime::<Utc>::MIN_UTC;
        let mut gen = MaxDrawdownGenerator::init(t0);
        gen.update(Decimal::ZERO, t0);
        let dd = gen.update(Decimal::ZERO, t0);
        assert_eq!(dd.value, Decimal::ZERO);
    }
}
