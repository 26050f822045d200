use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};
use crate::ledger::{TransferPlan, TxType, ESCROW_ACCOUNT};

/// Basis-point denominator
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Default creator fee (0.1%)
pub const DEFAULT_CREATOR_FEE_BP: u32 = 10;

/// Default platform fee (1%)
pub const DEFAULT_PLATFORM_FEE_BP: u32 = 100;

/// Breakdown of a traded amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub gross: u128,
    pub creator_fee: u128,
    pub platform_fee: u128,
    pub net: u128,
}

impl FeeSplit {
    pub fn total_fees(&self) -> u128 {
        self.creator_fee + self.platform_fee
    }
}

/// Splits trades into creator/platform/net parts and routes the fees out of escrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDistributor {
    pub creator_fee_bp: u32,
    pub platform_fee_bp: u32,
}

impl FeeDistributor {
    pub fn new(creator_fee_bp: u32, platform_fee_bp: u32) -> MarketResult<Self> {
        let total = u128::from(creator_fee_bp) + u128::from(platform_fee_bp);
        if total > BPS_DENOMINATOR {
            return Err(MarketError::InvalidAmount(format!(
                "fee rates sum to {} bp, above {}",
                total, BPS_DENOMINATOR
            )));
        }
        Ok(Self {
            creator_fee_bp,
            platform_fee_bp,
        })
    }

    pub fn split(&self, gross: u128) -> MarketResult<FeeSplit> {
        let creator_fee = bps_of(gross, self.creator_fee_bp)?;
        let platform_fee = bps_of(gross, self.platform_fee_bp)?;
        // Each fee is floored, so the sum never exceeds gross
        let net = gross - creator_fee - platform_fee;
        Ok(FeeSplit {
            gross,
            creator_fee,
            platform_fee,
            net,
        })
    }

    /// Queue the immediate fee payouts from escrow
    pub fn route(&self, split: &FeeSplit, creator: &str, platform: &str, plan: &mut TransferPlan) {
        plan.push(ESCROW_ACCOUNT, creator, split.creator_fee, TxType::CreatorFee);
        plan.push(ESCROW_ACCOUNT, platform, split.platform_fee, TxType::PlatformFee);
    }
}

impl Default for FeeDistributor {
    fn default() -> Self {
        Self {
            creator_fee_bp: DEFAULT_CREATOR_FEE_BP,
            platform_fee_bp: DEFAULT_PLATFORM_FEE_BP,
        }
    }
}

fn bps_of(amount: u128, bp: u32) -> MarketResult<u128> {
    amount
        .checked_mul(u128::from(bp))
        .map(|v| v / BPS_DENOMINATOR)
        .ok_or(MarketError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_split() {
        let fees = FeeDistributor::default();
        let split = fees.split(5_000_000_000_000_000_000).unwrap();
        assert_eq!(split.creator_fee, 5_000_000_000_000_000);
        assert_eq!(split.platform_fee, 50_000_000_000_000_000);
        assert_eq!(split.net, 4_945_000_000_000_000_000);
        assert_eq!(split.net + split.total_fees(), split.gross);
    }

    #[test]
    fn test_small_amounts_round_fees_down() {
        let fees = FeeDistributor::default();
        let split = fees.split(99).unwrap();
        assert_eq!(split.creator_fee, 0);
        assert_eq!(split.platform_fee, 0);
        assert_eq!(split.net, 99);

        let split = fees.split(1_000).unwrap();
        assert_eq!(split.creator_fee, 1);
        assert_eq!(split.platform_fee, 10);
        assert_eq!(split.net, 989);
    }

    #[test]
    fn test_rates_above_total_rejected() {
        assert!(FeeDistributor::new(5_000, 5_001).is_err());
        let all = FeeDistributor::new(5_000, 5_000).unwrap();
        assert_eq!(all.split(10).unwrap().net, 0);
    }

    #[test]
    fn test_route_skips_zero_fees() {
        let fees = FeeDistributor::default();
        let mut plan = TransferPlan::new(Some(1));
        fees.route(&fees.split(99).unwrap(), "CREATOR", "OWNER", &mut plan);
        assert!(plan.is_empty());

        fees.route(&fees.split(1_000).unwrap(), "CREATOR", "OWNER", &mut plan);
        let transfers = plan.transfers();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].to, "CREATOR");
        assert_eq!(transfers[0].amount, 1);
        assert_eq!(transfers[1].to, "OWNER");
        assert_eq!(transfers[1].amount, 10);
        assert!(transfers.iter().all(|t| t.from == ESCROW_ACCOUNT));
    }
}
