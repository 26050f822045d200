use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};

// ============================================================================
// BONDING CURVE
// ============================================================================

/// Default curve scale (1e15 per share² unit)
pub const DEFAULT_CURVE_K: u128 = 1_000_000_000_000_000;

/// Linear-price bonding curve for outcome shares
///
/// The marginal price of the n-th share is proportional to n, so the cost of
/// buying `shares` on top of `supply` is the area under that line:
///
/// ```text
///   buy_cost(s, x)    = k * x * (2s + x) / 2
///   sell_payout(s, x) = k * x * (2s - x) / 2
/// ```
///
/// Selling `x` at supply `s` returns exactly what buying `x` at `s - x` cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondingCurve {
    pub k: u128,
}

impl BondingCurve {
    pub fn new(k: u128) -> Self {
        Self { k }
    }

    /// Cost of minting `shares` when `supply` shares already exist
    pub fn buy_cost(&self, supply: u128, shares: u128) -> MarketResult<u128> {
        let span = supply
            .checked_mul(2)
            .and_then(|twice| twice.checked_add(shares))
            .ok_or(MarketError::ArithmeticOverflow)?;
        self.area(shares, span)
    }

    /// Proceeds of burning `shares` out of `supply`
    pub fn sell_payout(&self, supply: u128, shares: u128) -> MarketResult<u128> {
        if shares > supply {
            return Err(MarketError::InsufficientPoolSupply {
                supply,
                requested: shares,
            });
        }
        let span = supply
            .checked_mul(2)
            .map(|twice| twice - shares)
            .ok_or(MarketError::ArithmeticOverflow)?;
        self.area(shares, span)
    }

    fn area(&self, shares: u128, span: u128) -> MarketResult<u128> {
        self.k
            .checked_mul(shares)
            .and_then(|v| v.checked_mul(span))
            .map(|v| v / 2)
            .ok_or(MarketError::ArithmeticOverflow)
    }
}

impl Default for BondingCurve {
    fn default() -> Self {
        Self::new(DEFAULT_CURVE_K)
    }
}

// ============================================================================
// TESTS
// ============================================================================
