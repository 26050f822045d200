// ============================================================================
// Shares Module - PumpDump Prediction Market
// ============================================================================
//
// Fungible balance ledgers used by the engine:
//   - one position ledger per (market, outcome), holding outcome shares
//   - the reward token ledger (see rewards.rs)
//   - the currency and protocol-asset ledgers (see ledger.rs)
//
// The engine only relies on the BalanceLedger capability; TokenLedger is the
// in-memory implementation it ships with.
//
// ============================================================================

pub mod rewards;

pub use rewards::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{MarketError, MarketResult};
use crate::market_resolve::{AccountId, Market, Outcome, PositionTokenId, OUTCOME_COUNT};

// ============================================================================
// BALANCE LEDGER CAPABILITY
// ============================================================================

/// Mint / burn / transfer / balance-query over one fungible token
pub trait BalanceLedger {
    fn balance_of(&self, account: &str) -> u128;

    fn total_supply(&self) -> u128;

    fn mint(&mut self, account: &str, amount: u128) -> MarketResult<()>;

    fn burn(&mut self, account: &str, amount: u128) -> MarketResult<()>;

    fn transfer(&mut self, from: &str, to: &str, amount: u128) -> MarketResult<()>;
}

// ============================================================================
// TOKEN LEDGER
// ============================================================================

/// In-memory fungible token balances
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenLedger {
    pub symbol: String,
    balances: BTreeMap<AccountId, u128>,
    total_supply: u128,
}

impl TokenLedger {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            balances: BTreeMap::new(),
            total_supply: 0,
        }
    }

    /// Fails if minting `amount` would overflow the supply
    pub fn ensure_mintable(&self, amount: u128) -> MarketResult<()> {
        self.total_supply
            .checked_add(amount)
            .map(|_| ())
            .ok_or(MarketError::ArithmeticOverflow)
    }

    /// Overwrite a balance, keeping the supply consistent
    pub(crate) fn set_balance(&mut self, account: &str, amount: u128) -> MarketResult<()> {
        let current = self.balance_of(account);
        self.total_supply = (self.total_supply - current)
            .checked_add(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        if amount == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(account.to_string(), amount);
        }
        Ok(())
    }

    fn insufficient(&self, account: &str, requested: u128) -> MarketError {
        MarketError::InsufficientBalance {
            account: account.to_string(),
            available: self.balance_of(account),
            requested,
        }
    }
}

impl BalanceLedger for TokenLedger {
    fn balance_of(&self, account: &str) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> u128 {
        self.total_supply
    }

    fn mint(&mut self, account: &str, amount: u128) -> MarketResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.ensure_mintable(amount)?;
        // Every balance is bounded by the supply, so this cannot overflow either
        let balance = self.balance_of(account) + amount;
        self.balances.insert(account.to_string(), balance);
        self.total_supply += amount;
        Ok(())
    }

    fn burn(&mut self, account: &str, amount: u128) -> MarketResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balance_of(account);
        if balance < amount {
            return Err(self.insufficient(account, amount));
        }
        self.set_balance(account, balance - amount)
    }

    fn transfer(&mut self, from: &str, to: &str, amount: u128) -> MarketResult<()> {
        if amount == 0 || from == to {
            return if self.balance_of(from) >= amount {
                Ok(())
            } else {
                Err(self.insufficient(from, amount))
            };
        }
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(self.insufficient(from, amount));
        }
        let to_balance = self.balance_of(to) + amount;
        self.set_balance(from, from_balance - amount)?;
        self.set_balance(to, to_balance)
    }
}

// ============================================================================
// POSITION BOOK
// ============================================================================

/// The five outcome ledgers of every market, keyed by handle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionBook {
    ledgers: BTreeMap<PositionTokenId, TokenLedger>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the outcome ledgers for a freshly created market
    pub fn open_market(&mut self, market: &Market) {
        for token in &market.position_tokens {
            self.ledgers
                .entry(token.clone())
                .or_insert_with(|| TokenLedger::new(token.as_str()));
        }
    }

    pub fn ledger(&self, token: &PositionTokenId) -> Option<&TokenLedger> {
        self.ledgers.get(token)
    }

    pub fn ledger_mut(&mut self, token: &PositionTokenId) -> MarketResult<&mut TokenLedger> {
        self.ledgers
            .get_mut(token)
            .ok_or_else(|| MarketError::InvalidAmount(format!("unknown position token {}", token)))
    }

    pub fn balance_of(&self, token: &PositionTokenId, account: &str) -> u128 {
        self.ledger(token).map(|l| l.balance_of(account)).unwrap_or(0)
    }

    /// Balance of `account` in each outcome of `market`
    pub fn positions(&self, market: &Market, account: &str) -> [u128; OUTCOME_COUNT] {
        Outcome::ALL.map(|o| self.balance_of(market.position_token(o), account))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_and_burn() {
        let mut ledger = TokenLedger::new("TEST");
        ledger.mint("alice", 100).unwrap();
        ledger.mint("bob", 50).unwrap();
        assert_eq!(ledger.balance_of("alice"), 100);
        assert_eq!(ledger.total_supply(), 150);

        ledger.burn("alice", 40).unwrap();
        assert_eq!(ledger.balance_of("alice"), 60);
        assert_eq!(ledger.total_supply(), 110);
    }

    #[test]
    fn test_insufficient_burn() {
        let mut ledger = TokenLedger::new("TEST");
        ledger.mint("alice", 50).unwrap();

        let err = ledger.burn("alice", 100).unwrap_err();
        assert_eq!(
            err,
            MarketError::InsufficientBalance {
                account: "alice".into(),
                available: 50,
                requested: 100
            }
        );
        assert_eq!(ledger.balance_of("alice"), 50);
    }

    #[test]
    fn test_transfer_preserves_supply() {
        let mut ledger = TokenLedger::new("TEST");
        ledger.mint("alice", 100).unwrap();
        ledger.transfer("alice", "bob", 30).unwrap();
        assert_eq!(ledger.balance_of("alice"), 70);
        assert_eq!(ledger.balance_of("bob"), 30);
        assert_eq!(ledger.total_supply(), 100);

        assert!(ledger.transfer("bob", "alice", 31).is_err());
        assert!(ledger.transfer("alice", "alice", 70).is_ok());
        assert_eq!(ledger.balance_of("alice"), 70);
    }

    #[test]
    fn test_zero_balances_are_pruned() {
        let mut ledger = TokenLedger::new("TEST");
        ledger.mint("alice", 10).unwrap();
        ledger.burn("alice", 10).unwrap();
        assert!(ledger.balances.is_empty());
    }

    #[test]
    fn test_mint_overflow() {
        let mut ledger = TokenLedger::new("TEST");
        ledger.mint("alice", u128::MAX).unwrap();
        assert_eq!(ledger.mint("bob", 1).unwrap_err(), MarketError::ArithmeticOverflow);
        assert_eq!(ledger.balance_of("bob"), 0);
    }

    #[test]
    fn test_position_book_per_outcome() {
        let market = Market::new(3, "creator".into(), "0xtoken".into(), 1000, 0).unwrap();
        let mut book = PositionBook::new();
        book.open_market(&market);

        book.ledger_mut(market.position_token(Outcome::Pump))
            .unwrap()
            .mint("alice", 5)
            .unwrap();
        book.ledger_mut(market.position_token(Outcome::Rug))
            .unwrap()
            .mint("alice", 2)
            .unwrap();

        assert_eq!(book.positions(&market, "alice"), [5, 0, 0, 2, 0]);
        assert_eq!(book.positions(&market, "bob"), [0; OUTCOME_COUNT]);
    }
}
