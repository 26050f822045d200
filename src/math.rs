//! Fixed-point helpers for 1e18-scaled amounts

use alloy_primitives::U256;

use crate::error::{MarketError, MarketResult};

/// `a * b / denominator` with a 256-bit intermediate, truncating.
///
/// Pro-rata payouts multiply two 1e18-scaled quantities, which can exceed
/// u128 before the division brings the result back into range.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> MarketResult<u128> {
    if denominator == 0 {
        return Err(MarketError::ArithmeticOverflow);
    }
    let product = U256::from(a) * U256::from(b);
    let quotient = product / U256::from(denominator);
    u128::try_from(quotient).map_err(|_| MarketError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    const E18: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_mul_div_beyond_u128_product() {
        // 1000e18 * 510e18 does not fit in u128
        assert!((1_000 * E18).checked_mul(510 * E18).is_none());
        assert_eq!(mul_div(1_000 * E18, 510 * E18, 1_020 * E18).unwrap(), 500 * E18);
    }

    #[test]
    fn test_mul_div_truncates() {
        assert_eq!(mul_div(10, 1, 3).unwrap(), 3);
        assert_eq!(mul_div(u128::MAX, 1, 1).unwrap(), u128::MAX);
    }

    #[test]
    fn test_mul_div_rejects_overflow_and_zero() {
        assert_eq!(mul_div(u128::MAX, 2, 1).unwrap_err(), MarketError::ArithmeticOverflow);
        assert_eq!(mul_div(1, 1, 0).unwrap_err(), MarketError::ArithmeticOverflow);
    }
}
