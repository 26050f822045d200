/// Currency Ledger for the PumpDump engine
///
/// Tracks spendable balances of one asset (the trading currency, or the
/// protocol asset redeemed against reward shares) and a history of every
/// movement applied to it.
///
/// KEY FEATURES:
/// - Movements are grouped into a TransferPlan per operation
/// - A plan is validated as a whole before anything is applied
/// - Applying a plan is all-or-nothing
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{MarketError, MarketResult};
use crate::market_resolve::{AccountId, MarketId};
use crate::shares::{BalanceLedger, TokenLedger};

/// Account holding attached payments and the prize pools
pub const ESCROW_ACCOUNT: &str = "ENGINE";

/// Oldest history entries are dropped past this size
pub const MAX_TRANSACTION_HISTORY: usize = 10_000;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Transaction types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    /// Attached payment moved into escrow
    Payment,
    CreationFee,
    CreatorFee,
    PlatformFee,
    /// Overpayment returned to the caller
    Refund,
    SaleProceeds,
    Winnings,
    /// Faucet mint
    Deposit,
    ProtocolDeposit,
    ProtocolRedemption,
}

/// One queued movement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: u128,
    pub tx_type: TxType,
}

/// Movements belonging to one operation
#[derive(Debug, Clone, Default)]
pub struct TransferPlan {
    market_id: Option<MarketId>,
    transfers: Vec<Transfer>,
}

impl TransferPlan {
    pub fn new(market_id: Option<MarketId>) -> Self {
        Self {
            market_id,
            transfers: Vec::new(),
        }
    }

    /// Queue a movement; zero amounts are dropped
    pub fn push(&mut self, from: &str, to: &str, amount: u128, tx_type: TxType) {
        if amount == 0 {
            return;
        }
        self.transfers.push(Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            tx_type,
        });
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Net incoming and outgoing amounts per account
    fn flows(&self) -> MarketResult<BTreeMap<&str, (u128, u128)>> {
        let mut flows: BTreeMap<&str, (u128, u128)> = BTreeMap::new();
        for t in &self.transfers {
            let out = &mut flows.entry(t.from.as_str()).or_default().1;
            *out = out.checked_add(t.amount).ok_or(MarketError::ArithmeticOverflow)?;
            let inflow = &mut flows.entry(t.to.as_str()).or_default().0;
            *inflow = inflow.checked_add(t.amount).ok_or(MarketError::ArithmeticOverflow)?;
        }
        Ok(flows)
    }
}

/// A single applied movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tx_type: TxType,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: u128,
    pub market_id: Option<MarketId>,
    pub timestamp: u64,
}

impl Transaction {
    fn new(transfer: &Transfer, market_id: Option<MarketId>, timestamp: u64) -> Self {
        Self {
            id: format!("tx_{}", uuid::Uuid::new_v4().simple()),
            tx_type: transfer.tx_type,
            from: transfer.from.clone(),
            to: transfer.to.clone(),
            amount: transfer.amount,
            market_id,
            timestamp,
        }
    }
}

// ============================================================================
// LEDGER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    balances: TokenLedger,
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            balances: TokenLedger::new(symbol),
            transactions: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.balances.symbol
    }

    pub fn balance(&self, account: &str) -> u128 {
        self.balances.balance_of(account)
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.total_supply()
    }

    /// Verify every account in the plan can cover its net outflow
    pub fn check(&self, plan: &TransferPlan) -> MarketResult<()> {
        self.resulting_balances(plan).map(|_| ())
    }

    /// Apply a plan atomically and record one transaction per movement
    pub fn apply(&mut self, plan: &TransferPlan, now: u64) -> MarketResult<Vec<Transaction>> {
        let updated = self.resulting_balances(plan)?;
        for (account, balance) in updated {
            self.balances.set_balance(account, balance)?;
        }

        let applied: Vec<Transaction> = plan
            .transfers()
            .iter()
            .map(|t| Transaction::new(t, plan.market_id, now))
            .collect();
        self.record(applied.iter().cloned());
        Ok(applied)
    }

    /// Credit freshly issued units to an account (development faucet)
    pub fn mint(&mut self, account: &str, amount: u128, now: u64) -> MarketResult<Transaction> {
        self.balances.mint(account, amount)?;
        let tx = Transaction::new(
            &Transfer {
                from: "MINT".to_string(),
                to: account.to_string(),
                amount,
                tx_type: TxType::Deposit,
            },
            None,
            now,
        );
        self.record(std::iter::once(tx.clone()));
        Ok(tx)
    }

    /// Transactions touching an account, newest first
    pub fn transactions_for(&self, account: &str, limit: usize) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .rev()
            .filter(|tx| tx.from == account || tx.to == account)
            .take(limit)
            .collect()
    }

    fn resulting_balances<'p>(&self, plan: &'p TransferPlan) -> MarketResult<Vec<(&'p str, u128)>> {
        let mut updated = Vec::new();
        for (account, (inflow, outflow)) in plan.flows()? {
            let available = self
                .balance(account)
                .checked_add(inflow)
                .ok_or(MarketError::ArithmeticOverflow)?;
            if available < outflow {
                return Err(MarketError::InsufficientBalance {
                    account: account.to_string(),
                    available: self.balance(account),
                    requested: outflow - inflow.min(outflow),
                });
            }
            updated.push((account, available - outflow));
        }
        Ok(updated)
    }

    fn record(&mut self, txs: impl Iterator<Item = Transaction>) {
        self.transactions.extend(txs);
        if self.transactions.len() > MAX_TRANSACTION_HISTORY {
            let excess = self.transactions.len() - MAX_TRANSACTION_HISTORY;
            self.transactions.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded() -> Ledger {
        let mut ledger = Ledger::new("ETH");
        ledger.mint("alice", 1_000, 1).unwrap();
        ledger
    }

    #[test]
    fn test_apply_plan() {
        let mut ledger = funded();
        let mut plan = TransferPlan::new(Some(0));
        plan.push("alice", ESCROW_ACCOUNT, 600, TxType::Payment);
        plan.push(ESCROW_ACCOUNT, "owner", 50, TxType::PlatformFee);
        plan.push(ESCROW_ACCOUNT, "alice", 100, TxType::Refund);

        let applied = ledger.apply(&plan, 2).unwrap();
        assert_eq!(applied.len(), 3);
        assert_eq!(ledger.balance("alice"), 500);
        assert_eq!(ledger.balance(ESCROW_ACCOUNT), 450);
        assert_eq!(ledger.balance("owner"), 50);
        assert_eq!(ledger.total_supply(), 1_000);
        assert_eq!(ledger.transactions_for("owner", 10).len(), 1);
    }

    #[test]
    fn test_failed_plan_changes_nothing() {
        let mut ledger = funded();
        let mut plan = TransferPlan::new(None);
        plan.push("alice", "bob", 300, TxType::Payment);
        plan.push(ESCROW_ACCOUNT, "bob", 1, TxType::Winnings);

        let err = ledger.apply(&plan, 2).unwrap_err();
        assert!(matches!(err, MarketError::InsufficientBalance { ref account, .. } if account == ESCROW_ACCOUNT));
        assert_eq!(ledger.balance("alice"), 1_000);
        assert_eq!(ledger.balance("bob"), 0);
        assert_eq!(ledger.transactions.len(), 1);
    }

    #[test]
    fn test_check_uses_net_flows() {
        let ledger = funded();
        let mut plan = TransferPlan::new(None);
        // Escrow pays out only what the same plan brings in
        plan.push("alice", ESCROW_ACCOUNT, 200, TxType::Payment);
        plan.push(ESCROW_ACCOUNT, "alice", 150, TxType::Refund);
        assert!(ledger.check(&plan).is_ok());

        plan.push(ESCROW_ACCOUNT, "bob", 51, TxType::CreatorFee);
        assert!(ledger.check(&plan).is_err());
    }

    #[test]
    fn test_zero_transfers_are_dropped() {
        let mut plan = TransferPlan::new(None);
        plan.push("alice", "bob", 0, TxType::Refund);
        assert!(plan.is_empty());
    }
}
