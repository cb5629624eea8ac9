//! Monetary types for capital and share amounts.

use rust_decimal::Decimal;

/// Capital or share amount represented as a Decimal for precision.
///
/// One share pays one unit of the backing asset on its outcome, so the same
/// type covers tilt, lay offset and collateral.
pub type Amount = Decimal;

/// Return `value` if positive, otherwise zero.
#[must_use]
pub fn positive_part(value: Amount) -> Amount {
    value.max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn positive_part_clamps_negatives() {
        assert_eq!(positive_part(dec!(-3)), dec!(0));
        assert_eq!(positive_part(dec!(0)), dec!(0));
        assert_eq!(positive_part(dec!(2.5)), dec!(2.5));
    }
}
