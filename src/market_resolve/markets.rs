use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{MarketError, MarketResult};

/// Sequential market identifier, never reused
pub type MarketId = u64;

/// Opaque account identifier, compared for equality only
pub type AccountId = String;

/// Seconds in one settlement day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Number of outcomes every market carries
pub const OUTCOME_COUNT: usize = 5;

// ============================================================================
// OUTCOME
// ============================================================================

/// Settlement class of a market, derived from initial vs. final price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Pump,
    Dump,
    NoChange,
    Rug,
    Moon,
}

impl Outcome {
    pub const ALL: [Outcome; OUTCOME_COUNT] = [
        Outcome::Pump,
        Outcome::Dump,
        Outcome::NoChange,
        Outcome::Rug,
        Outcome::Moon,
    ];

    /// Ordinal used to index per-outcome arrays
    pub fn index(self) -> usize {
        match self {
            Outcome::Pump => 0,
            Outcome::Dump => 1,
            Outcome::NoChange => 2,
            Outcome::Rug => 3,
            Outcome::Moon => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Pump => "PUMP",
            Outcome::Dump => "DUMP",
            Outcome::NoChange => "NO_CHANGE",
            Outcome::Rug => "RUG",
            Outcome::Moon => "MOON",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Outcome::ALL
            .into_iter()
            .find(|o| o.as_str() == normalized)
            .ok_or_else(|| MarketError::InvalidAmount(format!("unknown outcome '{}'", s)))
    }
}

// ============================================================================
// POSITION TOKEN HANDLE
// ============================================================================

/// Handle naming the balance ledger that tracks one outcome of one market
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionTokenId(String);

impl PositionTokenId {
    pub fn new(market_id: MarketId, outcome: Outcome) -> Self {
        PositionTokenId(format!("market-{}-{}", market_id, outcome))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// MARKET
// ============================================================================

/// Lifecycle status derived from the market record and the current time
///
/// Flow: Open → Closed (settlement time passed) → Settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Closed,
    Settled,
}

/// Write-once settlement result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub outcome: Outcome,
    pub final_price: u128,
    pub settled_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub creator: AccountId,
    /// Descriptive address of the token this market tracks
    pub token_address: String,
    /// 1e18-scaled price at creation
    pub initial_price: u128,
    pub created_at: u64,
    pub settlement_time: u64,
    /// None until settled, then never changes
    pub settlement: Option<Settlement>,
    pub total_shares: [u128; OUTCOME_COUNT],
    /// Net currency attributable to each outcome's pool
    pub total_volume: [u128; OUTCOME_COUNT],
    pub position_tokens: [PositionTokenId; OUTCOME_COUNT],
}

impl Market {
    pub fn new(
        id: MarketId,
        creator: AccountId,
        token_address: String,
        initial_price: u128,
        created_at: u64,
    ) -> MarketResult<Self> {
        if initial_price == 0 {
            return Err(MarketError::InvalidPrice);
        }

        Ok(Self {
            id,
            creator,
            token_address,
            initial_price,
            created_at,
            settlement_time: settlement_time_for(created_at)?,
            settlement: None,
            total_shares: [0; OUTCOME_COUNT],
            total_volume: [0; OUTCOME_COUNT],
            position_tokens: Outcome::ALL.map(|o| PositionTokenId::new(id, o)),
        })
    }

    pub fn is_settled(&self) -> bool {
        self.settlement.is_some()
    }

    pub fn winning_outcome(&self) -> Option<Outcome> {
        self.settlement.map(|s| s.outcome)
    }

    pub fn final_price(&self) -> Option<u128> {
        self.settlement.map(|s| s.final_price)
    }

    /// Settlement time has passed and the market is still unsettled
    pub fn is_ready(&self, now: u64) -> bool {
        !self.is_settled() && now >= self.settlement_time
    }

    pub fn status(&self, now: u64) -> MarketStatus {
        if self.is_settled() {
            MarketStatus::Settled
        } else if now >= self.settlement_time {
            MarketStatus::Closed
        } else {
            MarketStatus::Open
        }
    }

    pub fn shares(&self, outcome: Outcome) -> u128 {
        self.total_shares[outcome.index()]
    }

    pub fn volume(&self, outcome: Outcome) -> u128 {
        self.total_volume[outcome.index()]
    }

    pub fn position_token(&self, outcome: Outcome) -> &PositionTokenId {
        &self.position_tokens[outcome.index()]
    }

    /// Sum of all outcome pools
    pub fn prize_pool(&self) -> MarketResult<u128> {
        self.total_volume
            .iter()
            .try_fold(0u128, |acc, v| acc.checked_add(*v))
            .ok_or(MarketError::ArithmeticOverflow)
    }

    /// Record the settlement result. Fails if the market already settled.
    pub fn settle(&mut self, outcome: Outcome, final_price: u128, now: u64) -> MarketResult<()> {
        if self.is_settled() {
            return Err(MarketError::AlreadySettled(self.id));
        }
        self.settlement = Some(Settlement {
            outcome,
            final_price,
            settled_at: now,
        });
        Ok(())
    }

    /// Remove a claimed amount from the pools, draining in outcome order
    pub fn drain_prize_pool(&mut self, mut amount: u128) -> MarketResult<()> {
        if amount > self.prize_pool()? {
            return Err(MarketError::ArithmeticOverflow);
        }
        for volume in self.total_volume.iter_mut() {
            let taken = amount.min(*volume);
            *volume -= taken;
            amount -= taken;
            if amount == 0 {
                break;
            }
        }
        Ok(())
    }
}

/// Next whole-day boundary strictly after `created_at`
pub fn settlement_time_for(created_at: u64) -> MarketResult<u64> {
    let day_start = (created_at / SECONDS_PER_DAY) * SECONDS_PER_DAY;
    day_start
        .checked_add(SECONDS_PER_DAY)
        .ok_or(MarketError::ArithmeticOverflow)
}

// ============================================================================
// MARKET REGISTRY
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketRegistry {
    markets: BTreeMap<MarketId, Market>,
    next_id: MarketId,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next created market will receive
    pub fn next_id(&self) -> MarketId {
        self.next_id
    }

    /// Store a market built for `next_id()` and advance the counter
    pub fn insert(&mut self, market: Market) -> MarketResult<MarketId> {
        if market.id != self.next_id {
            return Err(MarketError::InvalidAmount(format!(
                "market id {} does not match next id {}",
                market.id, self.next_id
            )));
        }
        let id = market.id;
        self.next_id = self.next_id.checked_add(1).ok_or(MarketError::ArithmeticOverflow)?;
        self.markets.insert(id, market);
        Ok(id)
    }

    pub fn get(&self, id: MarketId) -> Option<&Market> {
        self.markets.get(&id)
    }

    pub fn require(&self, id: MarketId) -> MarketResult<&Market> {
        self.markets.get(&id).ok_or(MarketError::MarketNotFound(id))
    }

    pub fn require_mut(&mut self, id: MarketId) -> MarketResult<&mut Market> {
        self.markets.get_mut(&id).ok_or(MarketError::MarketNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    pub fn count(&self) -> usize {
        self.markets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_ordinals_and_names() {
        for (i, outcome) in Outcome::ALL.iter().enumerate() {
            assert_eq!(outcome.index(), i);
            assert_eq!(Outcome::from_index(i), Some(*outcome));
        }
        assert_eq!(Outcome::from_index(5), None);
        assert_eq!("no_change".parse::<Outcome>().unwrap(), Outcome::NoChange);
        assert_eq!("Moon".parse::<Outcome>().unwrap(), Outcome::Moon);
        assert!("sideways".parse::<Outcome>().is_err());
    }

    #[test]
    fn test_settlement_time_next_boundary() {
        assert_eq!(settlement_time_for(0).unwrap(), SECONDS_PER_DAY);
        assert_eq!(settlement_time_for(1).unwrap(), SECONDS_PER_DAY);
        assert_eq!(settlement_time_for(SECONDS_PER_DAY - 1).unwrap(), SECONDS_PER_DAY);
        // Exactly on a boundary still moves to the next one
        assert_eq!(settlement_time_for(SECONDS_PER_DAY).unwrap(), 2 * SECONDS_PER_DAY);
        assert_eq!(settlement_time_for(1_700_000_000).unwrap(), 1_700_006_400);
        assert!(settlement_time_for(u64::MAX).is_err());
    }

    #[test]
    fn test_new_market_rejects_zero_price() {
        let result = Market::new(0, "ALICE".into(), "0xtoken".into(), 0, 100);
        assert_eq!(result.unwrap_err(), MarketError::InvalidPrice);
    }

    #[test]
    fn test_market_status_flow() {
        let mut market = Market::new(0, "ALICE".into(), "0xtoken".into(), 1000, 100).unwrap();
        assert_eq!(market.status(100), MarketStatus::Open);
        assert_eq!(market.status(SECONDS_PER_DAY), MarketStatus::Closed);
        assert!(market.is_ready(SECONDS_PER_DAY));

        market.settle(Outcome::Pump, 1150, SECONDS_PER_DAY).unwrap();
        assert_eq!(market.status(SECONDS_PER_DAY), MarketStatus::Settled);
        assert!(!market.is_ready(SECONDS_PER_DAY));

        // Write-once
        let err = market.settle(Outcome::Rug, 1, SECONDS_PER_DAY + 1).unwrap_err();
        assert_eq!(err, MarketError::AlreadySettled(0));
        assert_eq!(market.final_price(), Some(1150));
        assert_eq!(market.winning_outcome(), Some(Outcome::Pump));
    }

    #[test]
    fn test_position_tokens_are_distinct() {
        let market = Market::new(7, "ALICE".into(), "0xtoken".into(), 1000, 0).unwrap();
        assert_eq!(market.position_token(Outcome::Rug).as_str(), "market-7-RUG");
        let handles: std::collections::BTreeSet<_> = market.position_tokens.iter().collect();
        assert_eq!(handles.len(), OUTCOME_COUNT);
    }

    #[test]
    fn test_drain_prize_pool_in_outcome_order() {
        let mut market = Market::new(0, "ALICE".into(), "0xtoken".into(), 1000, 0).unwrap();
        market.total_volume = [10, 20, 0, 5, 5];
        market.drain_prize_pool(25).unwrap();
        assert_eq!(market.total_volume, [0, 5, 0, 5, 5]);
        assert_eq!(market.prize_pool().unwrap(), 15);
        assert!(market.drain_prize_pool(16).is_err());
        assert_eq!(market.prize_pool().unwrap(), 15);
    }

    #[test]
    fn test_registry_sequential_ids() {
        let mut registry = MarketRegistry::new();
        for expected in 0..3 {
            let id = registry.next_id();
            let market = Market::new(id, "ALICE".into(), "0xtoken".into(), 1000, 0).unwrap();
            assert_eq!(registry.insert(market).unwrap(), expected);
        }
        assert_eq!(registry.count(), 3);
        assert!(registry.require(2).is_ok());
        assert_eq!(registry.require(3).unwrap_err(), MarketError::MarketNotFound(3));

        // Stale id is refused
        let stale = Market::new(1, "BOB".into(), "0xtoken".into(), 1000, 0).unwrap();
        assert!(registry.insert(stale).is_err());
        assert_eq!(registry.next_id(), 3);
    }
}
