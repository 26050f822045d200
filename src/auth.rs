use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{MarketError, MarketResult};
use crate::market_resolve::AccountId;

/// Owner plus the allow-list of bots permitted to settle markets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRegistry {
    owner: AccountId,
    bots: BTreeSet<AccountId>,
}

impl AuthorizationRegistry {
    pub fn new(owner: impl Into<AccountId>) -> Self {
        Self {
            owner: owner.into(),
            bots: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_owner(&self, account: &str) -> bool {
        self.owner == account
    }

    pub fn require_owner(&self, caller: &str) -> MarketResult<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(MarketError::NotOwner(caller.to_string()))
        }
    }

    pub fn is_authorized_bot(&self, account: &str) -> bool {
        self.bots.contains(account)
    }

    /// Owner or an allow-listed bot
    pub fn can_settle(&self, caller: &str) -> bool {
        self.is_owner(caller) || self.is_authorized_bot(caller)
    }

    pub fn require_settler(&self, caller: &str) -> MarketResult<()> {
        if self.can_settle(caller) {
            Ok(())
        } else {
            Err(MarketError::NotAuthorized(caller.to_string()))
        }
    }

    /// Idempotent allow-list update. Returns whether membership changed.
    pub fn set_bot(&mut self, caller: &str, account: &str, authorized: bool) -> MarketResult<bool> {
        self.require_owner(caller)?;
        let changed = if authorized {
            self.bots.insert(account.to_string())
        } else {
            self.bots.remove(account)
        };
        Ok(changed)
    }

    /// Hand the owner role (and the platform fee stream) to another account
    pub fn transfer_ownership(&mut self, caller: &str, new_owner: &str) -> MarketResult<AccountId> {
        self.require_owner(caller)?;
        if new_owner.trim().is_empty() {
            return Err(MarketError::InvalidAmount("new owner is empty".into()));
        }
        Ok(std::mem::replace(&mut self.owner, new_owner.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_can_always_settle() {
        let auth = AuthorizationRegistry::new("OWNER");
        assert!(auth.can_settle("OWNER"));
        assert!(!auth.can_settle("BOT"));
        assert_eq!(
            auth.require_settler("BOT").unwrap_err(),
            MarketError::NotAuthorized("BOT".into())
        );
    }

    #[test]
    fn test_set_bot_is_idempotent() {
        let mut auth = AuthorizationRegistry::new("OWNER");
        assert!(auth.set_bot("OWNER", "BOT", true).unwrap());
        assert!(!auth.set_bot("OWNER", "BOT", true).unwrap());
        assert!(auth.is_authorized_bot("BOT"));

        assert!(auth.set_bot("OWNER", "BOT", false).unwrap());
        assert!(!auth.set_bot("OWNER", "BOT", false).unwrap());
        assert!(!auth.can_settle("BOT"));
    }

    #[test]
    fn test_only_owner_manages_bots() {
        let mut auth = AuthorizationRegistry::new("OWNER");
        assert_eq!(
            auth.set_bot("BOT", "BOT", true).unwrap_err(),
            MarketError::NotOwner("BOT".into())
        );
        assert!(!auth.is_authorized_bot("BOT"));
    }

    #[test]
    fn test_transfer_ownership() {
        let mut auth = AuthorizationRegistry::new("OWNER");
        assert!(auth.transfer_ownership("ALICE", "ALICE").is_err());
        assert_eq!(auth.transfer_ownership("OWNER", "ALICE").unwrap(), "OWNER");
        assert_eq!(auth.owner(), "ALICE");
        assert!(auth.require_owner("OWNER").is_err());
    }
}
