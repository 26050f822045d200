// Notifications emitted by the engine and the in-memory activity feed

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::info;

use crate::market_resolve::{AccountId, MarketId, Outcome};

/// Maximum number of records kept in the activity feed
pub const MAX_EVENT_LOG: usize = 1000;

/// Asset named in a funding notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    Currency,
    Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    MarketCreated {
        market_id: MarketId,
        creator: AccountId,
        token_address: String,
        initial_price: u128,
        settlement_time: u64,
    },
    SharesPurchased {
        market_id: MarketId,
        buyer: AccountId,
        outcome: Outcome,
        shares: u128,
        cost: u128,
    },
    SharesSold {
        market_id: MarketId,
        seller: AccountId,
        outcome: Outcome,
        shares: u128,
        payout: u128,
    },
    FeesPaid {
        market_id: MarketId,
        creator: AccountId,
        creator_fee: u128,
        platform_fee: u128,
    },
    MarketSettled {
        market_id: MarketId,
        outcome: Outcome,
        final_price: u128,
    },
    BatchSettlement {
        market_ids: Vec<MarketId>,
        success_count: usize,
    },
    WinningsClaimed {
        market_id: MarketId,
        account: AccountId,
        amount: u128,
    },
    BotAuthorized {
        account: AccountId,
        authorized: bool,
    },
    ProtocolTokenClaimed {
        account: AccountId,
        burned: u128,
        received: u128,
    },
    ProtocolTokenDeposited {
        depositor: AccountId,
        amount: u128,
    },
    AccountFunded {
        account: AccountId,
        asset: Asset,
        amount: u128,
    },
    OwnershipTransferred {
        previous: AccountId,
        new: AccountId,
    },
}

impl Notification {
    pub fn name(&self) -> &'static str {
        match self {
            Notification::MarketCreated { .. } => "MarketCreated",
            Notification::SharesPurchased { .. } => "SharesPurchased",
            Notification::SharesSold { .. } => "SharesSold",
            Notification::FeesPaid { .. } => "FeesPaid",
            Notification::MarketSettled { .. } => "MarketSettled",
            Notification::BatchSettlement { .. } => "BatchSettlement",
            Notification::WinningsClaimed { .. } => "WinningsClaimed",
            Notification::BotAuthorized { .. } => "BotAuthorized",
            Notification::ProtocolTokenClaimed { .. } => "ProtocolTokenClaimed",
            Notification::ProtocolTokenDeposited { .. } => "ProtocolTokenDeposited",
            Notification::AccountFunded { .. } => "AccountFunded",
            Notification::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }

    fn emoji(&self) -> &'static str {
        match self {
            Notification::MarketCreated { .. } => "📊",
            Notification::SharesPurchased { .. } => "🎯",
            Notification::SharesSold { .. } => "💱",
            Notification::FeesPaid { .. } => "💸",
            Notification::MarketSettled { .. } | Notification::BatchSettlement { .. } => "✅",
            Notification::WinningsClaimed { .. } => "🏆",
            Notification::BotAuthorized { .. } | Notification::OwnershipTransferred { .. } => "🔑",
            Notification::ProtocolTokenClaimed { .. } | Notification::ProtocolTokenDeposited { .. } => "🪙",
            Notification::AccountFunded { .. } => "🚰",
        }
    }

    /// One-line human readable summary
    pub fn describe(&self) -> String {
        match self {
            Notification::MarketCreated { market_id, creator, token_address, settlement_time, .. } => {
                format!("market {} on {} by {}, settles at {}", market_id, token_address, creator, settlement_time)
            }
            Notification::SharesPurchased { market_id, buyer, outcome, shares, cost } => {
                format!("{} bought {} {} in market {} for {}", buyer, shares, outcome, market_id, cost)
            }
            Notification::SharesSold { market_id, seller, outcome, shares, payout } => {
                format!("{} sold {} {} in market {} for {}", seller, shares, outcome, market_id, payout)
            }
            Notification::FeesPaid { market_id, creator, creator_fee, platform_fee } => {
                format!("market {}: {} to creator {}, {} to platform", market_id, creator_fee, creator, platform_fee)
            }
            Notification::MarketSettled { market_id, outcome, final_price } => {
                format!("market {} settled {} at {}", market_id, outcome, final_price)
            }
            Notification::BatchSettlement { market_ids, success_count } => {
                format!("batch settled {}/{} markets", success_count, market_ids.len())
            }
            Notification::WinningsClaimed { market_id, account, amount } => {
                format!("{} claimed {} from market {}", account, amount, market_id)
            }
            Notification::BotAuthorized { account, authorized } => {
                format!("bot {} authorized={}", account, authorized)
            }
            Notification::ProtocolTokenClaimed { account, burned, received } => {
                format!("{} burned {} reward shares for {}", account, burned, received)
            }
            Notification::ProtocolTokenDeposited { depositor, amount } => {
                format!("{} deposited {} into the protocol pool", depositor, amount)
            }
            Notification::AccountFunded { account, asset, amount } => {
                format!("{} funded with {} {:?}", account, amount, asset)
            }
            Notification::OwnershipTransferred { previous, new } => {
                format!("owner {} -> {}", previous, new)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: u64,
    pub notification: Notification,
}

/// Bounded feed of emitted notifications
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: VecDeque<EventRecord>,
    next_seq: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, notification: Notification, timestamp: u64) {
        let seq = self.next_seq;
        self.next_seq += 1;

        info!(
            seq,
            event = notification.name(),
            "{} {}",
            notification.emoji(),
            notification.describe()
        );

        self.records.push_back(EventRecord {
            seq,
            timestamp,
            notification,
        });
        if self.records.len() > MAX_EVENT_LOG {
            self.records.pop_front();
        }
    }

    /// Latest records, newest first
    pub fn recent(&self, limit: usize) -> Vec<&EventRecord> {
        self.records.iter().rev().take(limit).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total number of notifications ever emitted
    pub fn emitted(&self) -> u64 {
        self.next_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_capped() {
        let mut log = EventLog::new();
        for i in 0..(MAX_EVENT_LOG as u64 + 5) {
            log.emit(
                Notification::BotAuthorized {
                    account: format!("BOT{}", i),
                    authorized: true,
                },
                i,
            );
        }
        assert_eq!(log.len(), MAX_EVENT_LOG);
        assert_eq!(log.emitted(), MAX_EVENT_LOG as u64 + 5);

        let newest = log.recent(2);
        assert_eq!(newest[0].seq, MAX_EVENT_LOG as u64 + 4);
        assert_eq!(newest[1].seq, MAX_EVENT_LOG as u64 + 3);
    }

    #[test]
    fn test_notification_serializes_tagged() {
        let n = Notification::MarketSettled {
            market_id: 2,
            outcome: Outcome::NoChange,
            final_price: 1005,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["MarketSettled"]["outcome"], "NO_CHANGE");
        assert_eq!(json["MarketSettled"]["final_price"], 1005);
    }
}
