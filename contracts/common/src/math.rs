//! Mathematical Utilities for the BondGold Protocol
//!
//! Safe math operations and valuation formulas.

use crate::constants::{precision, ratios};
use crate::errors::{BondGoldError, BondGoldResult};

/// Calculate the reserve ratio
///
/// ratio = floor(total_gold_value * 100 / total_bond_value)
///
/// # Returns
/// Ratio as a percentage (e.g., 100 = 100%), or 0 when there is no bond value
pub fn calculate_reserve_ratio(total_gold_value: u64, total_bond_value: u64) -> u64 {
    if total_bond_value == 0 {
        return 0;
    }

    // u64 * 100 always fits in u128
    let ratio = (total_gold_value as u128 * ratios::PERCENT as u128) / total_bond_value as u128;
    ratio.min(u64::MAX as u128) as u64
}

/// Value a collateral amount at an 8-decimal price
///
/// value = amount * price / PRICE_PRECISION
///
/// # Errors
/// - `Overflow` if the value does not fit in u64
pub fn calculate_bond_value(amount: u64, price: u64) -> BondGoldResult<u64> {
    let value = (amount as u128)
        .checked_mul(price as u128)
        .ok_or(BondGoldError::Overflow)?
        / precision::PRICE_PRECISION as u128;

    u64::try_from(value).map_err(|_| BondGoldError::Overflow)
}

/// Safe addition with overflow check
pub fn safe_add(a: u64, b: u64) -> BondGoldResult<u64> {
    a.checked_add(b).ok_or(BondGoldError::Overflow)
}

/// Subtraction floored at zero; monetary counters never underflow
pub fn floor_sub(a: u64, b: u64) -> u64 {
    a.saturating_sub(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ONE_UNIT_PRICE: u64 = precision::PRICE_PRECISION;

    #[test]
    fn test_ratio_zero_bond_value() {
        assert_eq!(calculate_reserve_ratio(0, 0), 0);
        assert_eq!(calculate_reserve_ratio(1_000, 0), 0);
    }

    #[test]
    fn test_ratio_one_to_one() {
        assert_eq!(calculate_reserve_ratio(1_000, 1_000), 100);
    }

    #[test]
    fn test_ratio_floors() {
        // 2/3 = 66.66%
        assert_eq!(calculate_reserve_ratio(2, 3), 66);
        // 1199/1000 = 119.9%
        assert_eq!(calculate_reserve_ratio(1_199, 1_000), 119);
    }

    #[test]
    fn test_ratio_extreme_values() {
        assert_eq!(calculate_reserve_ratio(u64::MAX, 1), u64::MAX);
        assert_eq!(calculate_reserve_ratio(u64::MAX, u64::MAX), 100);
    }

    #[test]
    fn test_bond_value() {
        assert_eq!(calculate_bond_value(500, ONE_UNIT_PRICE).unwrap(), 500);
        // Half a unit per unit of collateral
        assert_eq!(calculate_bond_value(500, ONE_UNIT_PRICE / 2).unwrap(), 250);
        // Rounds down to zero
        assert_eq!(calculate_bond_value(1, ONE_UNIT_PRICE - 1).unwrap(), 0);
    }

    #[test]
    fn test_bond_value_overflow() {
        assert_eq!(
            calculate_bond_value(u64::MAX, u64::MAX),
            Err(BondGoldError::Overflow)
        );
    }

    #[test]
    fn test_safe_ops() {
        assert_eq!(safe_add(1, 2), Ok(3));
        assert_eq!(safe_add(u64::MAX, 1), Err(BondGoldError::Overflow));
        assert_eq!(floor_sub(5, 7), 0);
    }

    proptest! {
        #[test]
        fn prop_ratio_matches_floor_formula(gold in 0u64..=u64::MAX, bond in 1u64..=u64::MAX) {
            let expected = (gold as u128 * 100 / bond as u128).min(u64::MAX as u128) as u64;
            prop_assert_eq!(calculate_reserve_ratio(gold, bond), expected);
        }

        #[test]
        fn prop_equal_counters_are_fully_backed(value in 1u64..=u64::MAX) {
            prop_assert_eq!(calculate_reserve_ratio(value, value), 100);
        }
    }
}
