// ============================================================================
// Prediction Engine - PumpDump Prediction Market
// ============================================================================
//
// Single top-level state struct holding every registry the markets touch:
//
//   - owner + bot allow-list           (auth.rs)
//   - market records                   (market_resolve/markets.rs)
//   - five outcome ledgers per market  (shares/mod.rs)
//   - currency ledger with escrow      (ledger.rs)
//   - reward ledger + protocol pool    (shares/rewards.rs)
//   - activity feed                    (events.rs)
//
// Every mutating operation takes a `Call` and follows the same shape:
// validate, build and check the currency transfer plan, mutate internal
// counters, apply the plan, emit notifications. A failure before the commit
// leaves the engine untouched.
//
// Trading lives in market_resolve/trading.rs, settlement in
// market_resolve/settlement.rs.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::AuthorizationRegistry;
use crate::error::{MarketError, MarketResult};
use crate::events::{Asset, EventLog, EventRecord, Notification};
use crate::ledger::{Ledger, Transaction, TransferPlan, TxType, ESCROW_ACCOUNT};
use crate::market_resolve::{
    AccountId, BondingCurve, FeeDistributor, Market, MarketId, MarketRegistry, MarketStatus,
    Outcome, OUTCOME_COUNT,
};
use crate::shares::{PositionBook, Redemption, RewardLedger};

/// 1e18 fixed-point unit
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Default fee for creating a market (0.001 units)
pub const DEFAULT_CREATION_FEE: u128 = 1_000_000_000_000_000;

pub const DEFAULT_CREATOR_REWARD: u128 = 1_000 * UNIT;
pub const DEFAULT_TRADE_REWARD: u128 = 10 * UNIT;
pub const DEFAULT_WINNER_MULTIPLIER: u128 = 100;

/// Symbol of the trading currency ledger
pub const CURRENCY_SYMBOL: &str = "ETH";

// ============================================================================
// PARAMETERS AND CALL CONTEXT
// ============================================================================

/// Economic parameters, fixed for the lifetime of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParams {
    pub creation_fee: u128,
    pub curve: BondingCurve,
    pub fees: FeeDistributor,
    /// Reward minted to a creator per market created
    pub creator_reward: u128,
    /// Reward minted to a market's creator per buy
    pub trade_reward: u128,
    /// Reward per winning share claimed
    pub winner_multiplier: u128,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            creation_fee: DEFAULT_CREATION_FEE,
            curve: BondingCurve::default(),
            fees: FeeDistributor::default(),
            creator_reward: DEFAULT_CREATOR_REWARD,
            trade_reward: DEFAULT_TRADE_REWARD,
            winner_multiplier: DEFAULT_WINNER_MULTIPLIER,
        }
    }
}

/// Caller, attached payment and logical time of one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub caller: AccountId,
    pub value: u128,
    pub timestamp: u64,
}

impl Call {
    pub fn new(caller: impl Into<AccountId>, timestamp: u64) -> Self {
        Self {
            caller: caller.into(),
            value: 0,
            timestamp,
        }
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }

    /// Refuse a payment on operations that take none
    pub(crate) fn ensure_no_value(&self) -> MarketResult<()> {
        if self.value == 0 {
            Ok(())
        } else {
            Err(MarketError::InvalidAmount(format!(
                "operation does not accept a payment (got {})",
                self.value
            )))
        }
    }
}

// ============================================================================
// VIEWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeView {
    pub outcome: Outcome,
    pub total_shares: u128,
    pub total_volume: u128,
    pub position_token: String,
}

/// Market record plus derived fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketView {
    pub id: MarketId,
    pub creator: AccountId,
    pub token_address: String,
    pub initial_price: u128,
    pub created_at: u64,
    pub settlement_time: u64,
    pub status: MarketStatus,
    pub settled: bool,
    pub winning_outcome: Option<Outcome>,
    pub final_price: Option<u128>,
    pub prize_pool: u128,
    pub outcomes: Vec<OutcomeView>,
}

impl MarketView {
    pub fn new(market: &Market, now: u64) -> MarketResult<Self> {
        Ok(Self {
            id: market.id,
            creator: market.creator.clone(),
            token_address: market.token_address.clone(),
            initial_price: market.initial_price,
            created_at: market.created_at,
            settlement_time: market.settlement_time,
            status: market.status(now),
            settled: market.is_settled(),
            winning_outcome: market.winning_outcome(),
            final_price: market.final_price(),
            prize_pool: market.prize_pool()?,
            outcomes: Outcome::ALL
                .iter()
                .map(|&o| OutcomeView {
                    outcome: o,
                    total_shares: market.shares(o),
                    total_volume: market.volume(o),
                    position_token: market.position_token(o).to_string(),
                })
                .collect(),
        })
    }
}

/// Reward totals and the protocol asset handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardTotals {
    pub total_shares_issued: u128,
    pub protocol_token_balance: u128,
    pub protocol_token: Option<String>,
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionEngine {
    pub(crate) params: EngineParams,
    pub(crate) auth: AuthorizationRegistry,
    pub(crate) markets: MarketRegistry,
    pub(crate) positions: PositionBook,
    pub(crate) currency: Ledger,
    pub(crate) rewards: RewardLedger,
    pub(crate) events: EventLog,
}

impl PredictionEngine {
    pub fn new(owner: impl Into<AccountId>, params: EngineParams) -> Self {
        let auth = AuthorizationRegistry::new(owner);
        info!(
            owner = auth.owner(),
            creation_fee = %params.creation_fee,
            curve_k = %params.curve.k,
            creator_fee_bp = params.fees.creator_fee_bp,
            platform_fee_bp = params.fees.platform_fee_bp,
            "prediction engine initialized"
        );
        Self {
            params,
            auth,
            markets: MarketRegistry::new(),
            positions: PositionBook::new(),
            currency: Ledger::new(CURRENCY_SYMBOL),
            rewards: RewardLedger::new(),
            events: EventLog::new(),
        }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    // ========================================================================
    // MARKET CREATION
    // ========================================================================

    /// Create a market. The attached payment must cover the creation fee;
    /// the excess is refunded.
    pub fn create_market(
        &mut self,
        call: &Call,
        token_address: &str,
        initial_price: u128,
    ) -> MarketResult<MarketId> {
        let fee = self.params.creation_fee;
        if call.value < fee {
            return Err(MarketError::InsufficientFee {
                paid: call.value,
                required: fee,
            });
        }

        let market = Market::new(
            self.markets.next_id(),
            call.caller.clone(),
            token_address.to_string(),
            initial_price,
            call.timestamp,
        )?;

        let mut plan = TransferPlan::new(Some(market.id));
        plan.push(&call.caller, ESCROW_ACCOUNT, call.value, TxType::Payment);
        plan.push(ESCROW_ACCOUNT, self.auth.owner(), fee, TxType::CreationFee);
        plan.push(ESCROW_ACCOUNT, &call.caller, call.value - fee, TxType::Refund);
        self.currency.check(&plan)?;
        self.rewards.ensure_issuable(self.params.creator_reward)?;

        let notification = Notification::MarketCreated {
            market_id: market.id,
            creator: market.creator.clone(),
            token_address: market.token_address.clone(),
            initial_price: market.initial_price,
            settlement_time: market.settlement_time,
        };

        self.positions.open_market(&market);
        let market_id = self.markets.insert(market)?;
        self.rewards.issue(&call.caller, self.params.creator_reward)?;
        self.currency.apply(&plan, call.timestamp)?;

        self.events.emit(notification, call.timestamp);
        Ok(market_id)
    }

    // ========================================================================
    // ADMINISTRATION
    // ========================================================================

    pub fn authorize_bot(&mut self, call: &Call, account: &str, authorized: bool) -> MarketResult<()> {
        call.ensure_no_value()?;
        self.auth.set_bot(&call.caller, account, authorized)?;
        self.events.emit(
            Notification::BotAuthorized {
                account: account.to_string(),
                authorized,
            },
            call.timestamp,
        );
        Ok(())
    }

    pub fn transfer_ownership(&mut self, call: &Call, new_owner: &str) -> MarketResult<()> {
        call.ensure_no_value()?;
        let previous = self.auth.transfer_ownership(&call.caller, new_owner)?;
        self.events.emit(
            Notification::OwnershipTransferred {
                previous,
                new: new_owner.to_string(),
            },
            call.timestamp,
        );
        Ok(())
    }

    /// Fix the external asset reward shares redeem against (owner only, once)
    pub fn set_protocol_token(&mut self, call: &Call, handle: &str) -> MarketResult<()> {
        call.ensure_no_value()?;
        self.auth.require_owner(&call.caller)?;
        self.rewards.set_protocol_token(handle)?;
        info!(handle = handle.trim(), "protocol token set");
        Ok(())
    }

    /// Move protocol asset from the caller into the redemption pool
    pub fn deposit_protocol_tokens(&mut self, call: &Call, amount: u128) -> MarketResult<()> {
        call.ensure_no_value()?;
        self.rewards.deposit(&call.caller, amount, call.timestamp)?;
        self.events.emit(
            Notification::ProtocolTokenDeposited {
                depositor: call.caller.clone(),
                amount,
            },
            call.timestamp,
        );
        Ok(())
    }

    /// Burn reward shares for a pro-rata slice of the protocol pool
    pub fn claim_protocol_tokens(&mut self, call: &Call, share_amount: u128) -> MarketResult<Redemption> {
        call.ensure_no_value()?;
        let redemption = self.rewards.redeem(&call.caller, share_amount, call.timestamp)?;
        self.events.emit(
            Notification::ProtocolTokenClaimed {
                account: call.caller.clone(),
                burned: redemption.burned,
                received: redemption.received,
            },
            call.timestamp,
        );
        Ok(redemption)
    }

    /// Owner-only faucet minting currency or protocol asset to an account
    pub fn fund_account(
        &mut self,
        call: &Call,
        account: &str,
        asset: Asset,
        amount: u128,
    ) -> MarketResult<Transaction> {
        call.ensure_no_value()?;
        self.auth.require_owner(&call.caller)?;
        if amount == 0 {
            return Err(MarketError::InvalidAmount("funding amount must be greater than zero".into()));
        }
        let tx = match asset {
            Asset::Currency => self.currency.mint(account, amount, call.timestamp)?,
            Asset::Protocol => self.rewards.fund_asset(account, amount, call.timestamp)?,
        };
        debug!(account, ?asset, amount = %amount, tx = %tx.id, "account funded");
        self.events.emit(
            Notification::AccountFunded {
                account: account.to_string(),
                asset,
                amount,
            },
            call.timestamp,
        );
        Ok(tx)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn market(&self, id: MarketId) -> MarketResult<&Market> {
        self.markets.require(id)
    }

    pub fn market_view(&self, id: MarketId, now: u64) -> MarketResult<MarketView> {
        MarketView::new(self.markets.require(id)?, now)
    }

    /// All markets ordered by id
    pub fn list_markets(&self, now: u64) -> MarketResult<Vec<MarketView>> {
        self.markets.iter().map(|m| MarketView::new(m, now)).collect()
    }

    pub fn market_count(&self) -> usize {
        self.markets.count()
    }

    /// Balance of `account` in each outcome ledger of a market
    pub fn position(&self, id: MarketId, account: &str) -> MarketResult<[u128; OUTCOME_COUNT]> {
        let market = self.markets.require(id)?;
        Ok(self.positions.positions(market, account))
    }

    pub fn reward_balance(&self, account: &str) -> u128 {
        self.rewards.balance_of(account)
    }

    pub fn reward_totals(&self) -> RewardTotals {
        RewardTotals {
            total_shares_issued: self.rewards.total_shares_issued(),
            protocol_token_balance: self.rewards.protocol_token_balance(),
            protocol_token: self.rewards.protocol_token().map(str::to_string),
        }
    }

    pub fn currency_balance(&self, account: &str) -> u128 {
        self.currency.balance(account)
    }

    pub fn protocol_asset_balance(&self, account: &str) -> u128 {
        self.rewards.asset_balance(account)
    }

    pub fn currency_transactions(&self, account: &str, limit: usize) -> Vec<&Transaction> {
        self.currency.transactions_for(account, limit)
    }

    pub fn is_authorized_bot(&self, account: &str) -> bool {
        self.auth.is_authorized_bot(account)
    }

    pub fn owner(&self) -> &str {
        self.auth.owner()
    }

    pub fn recent_events(&self, limit: usize) -> Vec<&EventRecord> {
        self.events.recent(limit)
    }
}
