use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The fraction of winning trades, in `[0, 1]`, computed as `wins/total`.
///
/// Returns `None` if there were no trades (`total == 0`).
///
/// Reference: <https://www.investopedia.com/terms/w/win-loss-ratio.asp>
#[derive(Debug, Clone, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
pub struct WinRate {
    pub value: Decimal,
}

impl WinRate {
    pub fn calculate(wins: Decimal, total: Decimal) -> Option<Self> {
        if total == Decimal::ZERO {
            None
        } else {
            let value = wins.abs().checked_div(total.abs())?;
            Some(Self { value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn calculate() {
        assert_eq!(WinRate::calculate(Decimal::ZERO, Decimal::ZERO), None);
        assert_eq!(
            WinRate::calculate(Decimal::TEN, Decimal::TEN).unwrap().value,
            Decimal::ONE
        );
        assert_eq!(
            WinRate::calculate(dec!(6), Decimal::TEN).unwrap().value,
            dec!(0.6)
        );
    }
}
