// ============================================================================
// Trading - buy/sell on the bonding curve and prize claims
// ============================================================================
//
// BUY:   caller pays gross = curve cost, fees go straight to creator and
//        platform, net enters the outcome's pool, overpayment is refunded.
// SELL:  seller receives gross minus fees from escrow, the outcome's pool
//        shrinks by net (floored at zero).
// CLAIM: after settlement each winning share takes an equal slice of the
//        combined pool of all five outcomes.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{FeeSplit, MarketId, Outcome};
use crate::engine::{Call, PredictionEngine};
use crate::error::{MarketError, MarketResult};
use crate::events::Notification;
use crate::ledger::{TransferPlan, TxType, ESCROW_ACCOUNT};
use crate::math::mul_div;
use crate::shares::BalanceLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Price of a trade without executing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradeQuote {
    pub side: TradeSide,
    pub outcome: Outcome,
    pub shares: u128,
    pub supply: u128,
    pub split: FeeSplit,
}

/// Executed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradeReceipt {
    pub market_id: MarketId,
    pub side: TradeSide,
    pub outcome: Outcome,
    pub shares: u128,
    pub split: FeeSplit,
    /// Overpayment returned on a buy
    pub refund: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClaimReceipt {
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub shares_burned: u128,
    pub winnings: u128,
    pub reward_bonus: u128,
}

impl PredictionEngine {
    // ========================================================================
    // QUOTES
    // ========================================================================

    pub fn quote_buy(&self, id: MarketId, outcome: Outcome, shares: u128) -> MarketResult<TradeQuote> {
        if shares == 0 {
            return Err(MarketError::InvalidShareAmount);
        }
        let supply = self.markets.require(id)?.shares(outcome);
        let gross = self.params.curve.buy_cost(supply, shares)?;
        Ok(TradeQuote {
            side: TradeSide::Buy,
            outcome,
            shares,
            supply,
            split: self.params.fees.split(gross)?,
        })
    }

    pub fn quote_sell(&self, id: MarketId, outcome: Outcome, shares: u128) -> MarketResult<TradeQuote> {
        if shares == 0 {
            return Err(MarketError::InvalidShareAmount);
        }
        let supply = self.markets.require(id)?.shares(outcome);
        let gross = self.params.curve.sell_payout(supply, shares)?;
        Ok(TradeQuote {
            side: TradeSide::Sell,
            outcome,
            shares,
            supply,
            split: self.params.fees.split(gross)?,
        })
    }

    // ========================================================================
    // BUY
    // ========================================================================

    pub fn buy_shares(
        &mut self,
        call: &Call,
        id: MarketId,
        outcome: Outcome,
        shares: u128,
    ) -> MarketResult<TradeReceipt> {
        if shares == 0 {
            return Err(MarketError::InvalidShareAmount);
        }
        let market = self.markets.require(id)?;
        if market.is_settled() {
            return Err(MarketError::AlreadySettled(id));
        }
        if call.timestamp >= market.settlement_time {
            return Err(MarketError::MarketClosed(id));
        }

        let supply = market.shares(outcome);
        let cost = self.params.curve.buy_cost(supply, shares)?;
        if call.value < cost {
            return Err(MarketError::InsufficientPayment {
                paid: call.value,
                required: cost,
            });
        }
        let split = self.params.fees.split(cost)?;
        let refund = call.value - cost;
        debug!(
            market_id = id,
            %outcome,
            shares = %shares,
            supply = %supply,
            cost = %cost,
            net = %split.net,
            "buy priced"
        );

        let creator = market.creator.clone();
        let new_shares = supply.checked_add(shares).ok_or(MarketError::ArithmeticOverflow)?;
        let new_volume = market
            .volume(outcome)
            .checked_add(split.net)
            .ok_or(MarketError::ArithmeticOverflow)?;
        let token = market.position_token(outcome).clone();

        let mut plan = TransferPlan::new(Some(id));
        plan.push(&call.caller, ESCROW_ACCOUNT, call.value, TxType::Payment);
        self.params.fees.route(&split, &creator, self.auth.owner(), &mut plan);
        plan.push(ESCROW_ACCOUNT, &call.caller, refund, TxType::Refund);
        self.currency.check(&plan)?;
        self.positions.ledger_mut(&token)?.ensure_mintable(shares)?;
        self.rewards.ensure_issuable(self.params.trade_reward)?;

        // Commit
        let market = self.markets.require_mut(id)?;
        market.total_shares[outcome.index()] = new_shares;
        market.total_volume[outcome.index()] = new_volume;
        self.positions.ledger_mut(&token)?.mint(&call.caller, shares)?;
        self.rewards.issue(&creator, self.params.trade_reward)?;
        self.currency.apply(&plan, call.timestamp)?;

        self.events.emit(
            Notification::SharesPurchased {
                market_id: id,
                buyer: call.caller.clone(),
                outcome,
                shares,
                cost,
            },
            call.timestamp,
        );
        self.emit_fees(id, creator, &split, call.timestamp);

        Ok(TradeReceipt {
            market_id: id,
            side: TradeSide::Buy,
            outcome,
            shares,
            split,
            refund,
        })
    }

    // ========================================================================
    // SELL
    // ========================================================================

    pub fn sell_shares(
        &mut self,
        call: &Call,
        id: MarketId,
        outcome: Outcome,
        shares: u128,
    ) -> MarketResult<TradeReceipt> {
        call.ensure_no_value()?;
        if shares == 0 {
            return Err(MarketError::InvalidShareAmount);
        }
        let market = self.markets.require(id)?;
        let token = market.position_token(outcome).clone();
        let available = self.positions.balance_of(&token, &call.caller);
        if available < shares {
            return Err(MarketError::InsufficientShares {
                available,
                requested: shares,
            });
        }
        match market.winning_outcome() {
            Some(winning) if winning != outcome => {
                return Err(MarketError::OnlyWinnersCanSellAfterSettlement {
                    market_id: id,
                    winning,
                });
            }
            Some(_) => {}
            None if call.timestamp >= market.settlement_time => {
                return Err(MarketError::MarketClosed(id));
            }
            None => {}
        }

        let supply = market.shares(outcome);
        let payout = self.params.curve.sell_payout(supply, shares)?;
        let split = self.params.fees.split(payout)?;
        debug!(
            market_id = id,
            %outcome,
            shares = %shares,
            supply = %supply,
            payout = %payout,
            net = %split.net,
            "sell priced"
        );

        let creator = market.creator.clone();
        let volume = market.volume(outcome);
        if split.net > volume {
            warn!(
                market_id = id,
                %outcome,
                volume = %volume,
                net = %split.net,
                "sale exceeds outcome pool, clamping pool to zero"
            );
        }
        let new_volume = volume.saturating_sub(split.net);

        let mut plan = TransferPlan::new(Some(id));
        plan.push(ESCROW_ACCOUNT, &call.caller, split.net, TxType::SaleProceeds);
        self.params.fees.route(&split, &creator, self.auth.owner(), &mut plan);
        self.currency.check(&plan)?;

        // Commit
        let market = self.markets.require_mut(id)?;
        market.total_shares[outcome.index()] = supply - shares;
        market.total_volume[outcome.index()] = new_volume;
        self.positions.ledger_mut(&token)?.burn(&call.caller, shares)?;
        self.currency.apply(&plan, call.timestamp)?;

        self.events.emit(
            Notification::SharesSold {
                market_id: id,
                seller: call.caller.clone(),
                outcome,
                shares,
                payout: split.net,
            },
            call.timestamp,
        );
        self.emit_fees(id, creator, &split, call.timestamp);

        Ok(TradeReceipt {
            market_id: id,
            side: TradeSide::Sell,
            outcome,
            shares,
            split,
            refund: 0,
        })
    }

    // ========================================================================
    // CLAIM
    // ========================================================================

    /// Burn the caller's winning shares for their slice of the prize pool
    pub fn claim_winnings(&mut self, call: &Call, id: MarketId) -> MarketResult<ClaimReceipt> {
        call.ensure_no_value()?;
        let market = self.markets.require(id)?;
        let winning = market.winning_outcome().ok_or(MarketError::NotSettled(id))?;
        let token = market.position_token(winning).clone();

        let user_shares = self.positions.balance_of(&token, &call.caller);
        if user_shares == 0 {
            return Err(MarketError::NoWinningShares(id));
        }
        let total_winning = market.shares(winning);
        if total_winning == 0 {
            return Err(MarketError::NoWinningSharesExist(id));
        }

        let pool = market.prize_pool()?;
        let winnings = mul_div(pool, user_shares, total_winning)?;
        let bonus = user_shares
            .checked_mul(self.params.winner_multiplier)
            .ok_or(MarketError::ArithmeticOverflow)?;
        debug!(
            market_id = id,
            pool = %pool,
            user_shares = %user_shares,
            total_winning = %total_winning,
            winnings = %winnings,
            "claim priced"
        );

        let mut plan = TransferPlan::new(Some(id));
        plan.push(ESCROW_ACCOUNT, &call.caller, winnings, TxType::Winnings);
        self.currency.check(&plan)?;
        self.rewards.ensure_issuable(bonus)?;

        // Commit
        let market = self.markets.require_mut(id)?;
        market.drain_prize_pool(winnings)?;
        market.total_shares[winning.index()] = total_winning - user_shares;
        self.positions.ledger_mut(&token)?.burn(&call.caller, user_shares)?;
        self.rewards.issue(&call.caller, bonus)?;
        self.currency.apply(&plan, call.timestamp)?;

        self.events.emit(
            Notification::WinningsClaimed {
                market_id: id,
                account: call.caller.clone(),
                amount: winnings,
            },
            call.timestamp,
        );

        Ok(ClaimReceipt {
            market_id: id,
            outcome: winning,
            shares_burned: user_shares,
            winnings,
            reward_bonus: bonus,
        })
    }

    fn emit_fees(&mut self, id: MarketId, creator: String, split: &FeeSplit, now: u64) {
        self.events.emit(
            Notification::FeesPaid {
                market_id: id,
                creator,
                creator_fee: split.creator_fee,
                platform_fee: split.platform_fee,
            },
            now,
        );
    }
}
