//! Monetary type for bribes, costs and slot values.

use rust_decimal::Decimal;

/// Amount of value, measured in slot-value units.
///
/// With the default slot value of 100, one unit is a hundredth of a
/// proposer slot.
pub type Amount = Decimal;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amounts_are_exact_decimals() {
        let bribe: Amount = dec!(0.1);
        let fee: Amount = dec!(0.2);

        assert_eq!(bribe + fee, dec!(0.3));
    }
}
