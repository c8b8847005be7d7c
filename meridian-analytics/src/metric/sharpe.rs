use crate::time::TimeInterval;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

/// A Sharpe Ratio value over a specific [`TimeInterval`].
///
/// The Sharpe Ratio measures risk-adjusted return by comparing the excess
/// return (above the risk-free rate) to the standard deviation of returns.
///
/// Reference: <https://www.investopedia.com/articles/07/sharpe_ratio.asp>
#[derive(Debug, Clone, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
pub struct SharpeRatio<Interval> {
    pub value: Decimal,
    pub interval: Interval,
}

impl<Interval> SharpeRatio<Interval>
where
    Interval: TimeInterval,
{
    pub fn calculate(
        risk_free_return: Decimal,
        mean_return: Decimal,
        std_dev_returns: Decimal,
        returns_period: Interval,
    ) -> Self {
        if std_dev_returns.is_zero() {
            Self {
                value: Decimal::MAX,
                interval: returns_period,
            }
        } else {
            let excess_returns = mean_return - risk_free_return;
            let ratio = excess_returns.checked_div(std_dev_returns).unwrap();
            Self {
                value: ratio,
                interval: returns_period,
            }
        }
    }

    /// Scales this Sharpe Ratio from its current interval to `target`,
    /// assuming i.i.d. returns.
    pub fn scale<TargetInterval>(self, target: TargetInterval) -> SharpeRatio<TargetInterval>
    where
        TargetInterval: TimeInterval,
    {
        let target_secs = Decimal::from(target.interval().num_seconds());
        let current_secs = Decimal::from(self.interval.interval().num_seconds());

        let scale = target_secs
            .abs()
            .checked_div(current_secs.abs())
            .unwrap_or(Decimal::MAX)
            .sqrt()
            .expect("ensured seconds are positive");

        SharpeRatio {
            value: self.value.checked_mul(scale).unwrap_or(Decimal::MAX),
            interval: target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{Annual252, Daily};
    use chrono::TimeDelta;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_std_dev_yields_max() {
        let result = SharpeRatio::calculate(dec!(0.001), dec!(0.002), dec!(0.0), TimeDelta::hours(2));
        assert_eq!(result.value, Decimal::MAX);
    }

    #[test]
    fn calculate_with_custom_interval() {
        let actual = SharpeRatio::calculate(dec!(0.0015), dec!(0.0025), dec!(0.02), TimeDelta::hours(2));
        assert_eq!(actual.value, dec!(0.05));
    }

    #[test]
    fn scale_from_daily_to_annual_252() {
        let input = SharpeRatio {
            value: dec!(0.05),
            interval: Daily,
        };
        let actual = input.scale(Annual252);
        assert_eq!(actual.value, dec!(0.7937253933193771771504847261));
    }
}
