// ============================================================================
// Reward Ledger - PumpDump Prediction Market
// ============================================================================
//
// Secondary incentive economy running beside the markets.
//
// Issuance:
//   - creators receive a fixed reward per market and per buy on their market
//   - winners receive a bonus per winning share claimed
//
// Redemption:
//   Reward shares can be burned against a pool of an external "protocol"
//   asset, pro-rata to the shares still outstanding:
//
//     received = pool * burned / total_shares_issued
//
//   The asset handle is fixed once. Deposits grow the pool, redemptions
//   shrink both the pool and the outstanding share count, so later
//   redeemers keep the same rate.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BalanceLedger, TokenLedger};
use crate::error::{MarketError, MarketResult};
use crate::ledger::{Ledger, Transaction, TransferPlan, TxType, ESCROW_ACCOUNT};
use crate::math::mul_div;

/// Symbol of the reward token
pub const REWARD_SYMBOL: &str = "PDR";

/// Result of burning reward shares against the protocol pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Redemption {
    pub burned: u128,
    pub received: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardLedger {
    token: TokenLedger,
    /// Reward shares minted and not yet redeemed
    total_shares_issued: u128,
    /// Protocol asset held in escrow for redemptions
    protocol_token_balance: u128,
    /// Created by `set_protocol_token`, named after the asset handle
    protocol_asset: Option<Ledger>,
}

impl Default for RewardLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardLedger {
    pub fn new() -> Self {
        Self {
            token: TokenLedger::new(REWARD_SYMBOL),
            total_shares_issued: 0,
            protocol_token_balance: 0,
            protocol_asset: None,
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn balance_of(&self, account: &str) -> u128 {
        self.token.balance_of(account)
    }

    pub fn total_shares_issued(&self) -> u128 {
        self.total_shares_issued
    }

    pub fn protocol_token_balance(&self) -> u128 {
        self.protocol_token_balance
    }

    pub fn protocol_token(&self) -> Option<&str> {
        self.protocol_asset.as_ref().map(|l| l.symbol())
    }

    pub fn asset_balance(&self, account: &str) -> u128 {
        self.protocol_asset
            .as_ref()
            .map(|l| l.balance(account))
            .unwrap_or(0)
    }

    // ========================================================================
    // ISSUANCE
    // ========================================================================

    /// Fails if issuing `amount` would overflow either counter
    pub fn ensure_issuable(&self, amount: u128) -> MarketResult<()> {
        self.token.ensure_mintable(amount)?;
        self.total_shares_issued
            .checked_add(amount)
            .map(|_| ())
            .ok_or(MarketError::ArithmeticOverflow)
    }

    /// Mint reward shares to `account`
    pub fn issue(&mut self, account: &str, amount: u128) -> MarketResult<()> {
        self.ensure_issuable(amount)?;
        self.token.mint(account, amount)?;
        self.total_shares_issued += amount;
        debug!(account, amount = %amount, total = %self.total_shares_issued, "reward shares issued");
        Ok(())
    }

    // ========================================================================
    // PROTOCOL POOL
    // ========================================================================

    /// Fix the redemption asset. Can only happen once.
    pub fn set_protocol_token(&mut self, handle: &str) -> MarketResult<()> {
        if let Some(existing) = self.protocol_token() {
            return Err(MarketError::ProtocolTokenAlreadySet(existing.to_string()));
        }
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(MarketError::InvalidAmount("protocol token handle is empty".into()));
        }
        self.protocol_asset = Some(Ledger::new(handle));
        Ok(())
    }

    /// Move `amount` of the asset from the depositor into the pool
    pub fn deposit(&mut self, depositor: &str, amount: u128, now: u64) -> MarketResult<()> {
        let asset = self.protocol_asset.as_mut().ok_or(MarketError::ProtocolTokenNotSet)?;
        if amount == 0 {
            return Err(MarketError::InvalidAmount("deposit must be greater than zero".into()));
        }

        let pool = self
            .protocol_token_balance
            .checked_add(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;

        let mut plan = TransferPlan::new(None);
        plan.push(depositor, ESCROW_ACCOUNT, amount, TxType::ProtocolDeposit);
        asset.apply(&plan, now)?;

        self.protocol_token_balance = pool;
        Ok(())
    }

    /// Amount of the asset `share_amount` reward shares would redeem for
    pub fn quote_redemption(&self, share_amount: u128) -> MarketResult<u128> {
        if self.total_shares_issued == 0 {
            return Err(MarketError::NoSharesIssued);
        }
        mul_div(self.protocol_token_balance, share_amount, self.total_shares_issued)
    }

    /// Burn reward shares and pay out the pro-rata part of the pool
    pub fn redeem(&mut self, account: &str, share_amount: u128, now: u64) -> MarketResult<Redemption> {
        if self.protocol_asset.is_none() {
            return Err(MarketError::ProtocolTokenNotSet);
        }
        if share_amount == 0 {
            return Err(MarketError::InvalidAmount("share amount must be greater than zero".into()));
        }
        let available = self.token.balance_of(account);
        if available < share_amount {
            return Err(MarketError::InsufficientRewardShares {
                available,
                requested: share_amount,
            });
        }
        if self.total_shares_issued == 0 {
            return Err(MarketError::NoSharesIssued);
        }
        if self.protocol_token_balance == 0 {
            return Err(MarketError::EmptyProtocolPool);
        }

        let received = self.quote_redemption(share_amount)?;
        if received == 0 {
            return Err(MarketError::AmountTooSmall);
        }

        let mut plan = TransferPlan::new(None);
        plan.push(ESCROW_ACCOUNT, account, received, TxType::ProtocolRedemption);
        let asset = self.protocol_asset.as_mut().ok_or(MarketError::ProtocolTokenNotSet)?;
        asset.check(&plan)?;

        // Balance covers the burn and the issued total bounds every balance
        self.token.burn(account, share_amount)?;
        self.total_shares_issued -= share_amount;
        self.protocol_token_balance -= received;
        asset.apply(&plan, now)?;

        Ok(Redemption {
            burned: share_amount,
            received,
        })
    }

    /// Mint protocol asset to an account outside the pool (faucet)
    pub fn fund_asset(&mut self, account: &str, amount: u128, now: u64) -> MarketResult<Transaction> {
        self.protocol_asset
            .as_mut()
            .ok_or(MarketError::ProtocolTokenNotSet)?
            .mint(account, amount, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_pool(pool: u128) -> RewardLedger {
        let mut rewards = RewardLedger::new();
        rewards.set_protocol_token("PUMP").unwrap();
        rewards.fund_asset("treasury", pool, 0).unwrap();
        rewards.deposit("treasury", pool, 0).unwrap();
        rewards
    }

    #[test]
    fn test_issue_tracks_total() {
        let mut rewards = RewardLedger::new();
        rewards.issue("alice", 1_000).unwrap();
        rewards.issue("bob", 500).unwrap();
        assert_eq!(rewards.balance_of("alice"), 1_000);
        assert_eq!(rewards.total_shares_issued(), 1_500);
    }

    #[test]
    fn test_protocol_token_set_once() {
        let mut rewards = RewardLedger::new();
        assert!(matches!(rewards.set_protocol_token("  "), Err(MarketError::InvalidAmount(_))));
        rewards.set_protocol_token("PUMP").unwrap();
        assert_eq!(
            rewards.set_protocol_token("OTHER").unwrap_err(),
            MarketError::ProtocolTokenAlreadySet("PUMP".into())
        );
        assert_eq!(rewards.protocol_token(), Some("PUMP"));
    }

    #[test]
    fn test_deposit_requires_asset_and_balance() {
        let mut rewards = RewardLedger::new();
        assert_eq!(rewards.deposit("alice", 10, 0).unwrap_err(), MarketError::ProtocolTokenNotSet);

        rewards.set_protocol_token("PUMP").unwrap();
        assert!(matches!(rewards.deposit("alice", 0, 0), Err(MarketError::InvalidAmount(_))));
        assert!(matches!(
            rewards.deposit("alice", 10, 0),
            Err(MarketError::InsufficientBalance { .. })
        ));
        assert_eq!(rewards.protocol_token_balance(), 0);
    }

    #[test]
    fn test_redeem_pro_rata() {
        let mut rewards = with_pool(1_000);
        rewards.issue("alice", 300).unwrap();
        rewards.issue("bob", 700).unwrap();

        let r = rewards.redeem("alice", 300, 1).unwrap();
        assert_eq!(r, Redemption { burned: 300, received: 300 });
        assert_eq!(rewards.total_shares_issued(), 700);
        assert_eq!(rewards.protocol_token_balance(), 700);
        assert_eq!(rewards.asset_balance("alice"), 300);
        assert_eq!(rewards.asset_balance(ESCROW_ACCOUNT), 700);

        // Rate is unchanged for the remaining holder
        let r = rewards.redeem("bob", 700, 2).unwrap();
        assert_eq!(r.received, 700);
        assert_eq!(rewards.protocol_token_balance(), 0);
        assert_eq!(rewards.total_shares_issued(), 0);
    }

    #[test]
    fn test_redeem_validation_order() {
        let mut rewards = RewardLedger::new();
        rewards.issue("alice", 10).unwrap();
        assert_eq!(rewards.redeem("alice", 1, 0).unwrap_err(), MarketError::ProtocolTokenNotSet);

        rewards.set_protocol_token("PUMP").unwrap();
        assert!(matches!(rewards.redeem("alice", 0, 0), Err(MarketError::InvalidAmount(_))));
        assert_eq!(
            rewards.redeem("alice", 11, 0).unwrap_err(),
            MarketError::InsufficientRewardShares { available: 10, requested: 11 }
        );
        assert_eq!(rewards.redeem("alice", 5, 0).unwrap_err(), MarketError::EmptyProtocolPool);
    }

    #[test]
    fn test_redeem_dust_rejected() {
        let mut rewards = with_pool(3);
        rewards.issue("alice", 1_000).unwrap();
        assert_eq!(rewards.redeem("alice", 100, 0).unwrap_err(), MarketError::AmountTooSmall);
        assert_eq!(rewards.balance_of("alice"), 1_000);
        assert_eq!(rewards.protocol_token_balance(), 3);
    }
}
