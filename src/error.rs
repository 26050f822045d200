//! Error types for the PumpDump prediction market engine

use serde::Serialize;
use thiserror::Error;

use crate::market_resolve::{MarketId, Outcome};

/// Broad class of a failure, used to pick an HTTP status and for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Validation,
    Authorization,
    State,
    Resource,
    Internal,
}

/// Errors that may be returned by any engine operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    // === Validation ===
    #[error("invalid share amount: must be greater than zero")]
    InvalidShareAmount,

    #[error("invalid price: initial price must be greater than zero")]
    InvalidPrice,

    #[error("array length mismatch: {ids} market ids but {prices} prices")]
    ArrayLengthMismatch { ids: usize, prices: usize },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    // === Authorization ===
    #[error("caller {0} is not the owner")]
    NotOwner(String),

    #[error("caller {0} is not authorized to settle markets")]
    NotAuthorized(String),

    // === State ===
    #[error("market {0} not found")]
    MarketNotFound(MarketId),

    #[error("market {0} is already settled")]
    AlreadySettled(MarketId),

    #[error("market {0} is not settled yet")]
    NotSettled(MarketId),

    #[error("market {market_id} cannot settle before {settlement_time} (now {now})")]
    TooEarly {
        market_id: MarketId,
        settlement_time: u64,
        now: u64,
    },

    #[error("market {0} is closed for trading")]
    MarketClosed(MarketId),

    #[error("only {winning} shares can be sold after market {market_id} settled")]
    OnlyWinnersCanSellAfterSettlement { market_id: MarketId, winning: Outcome },

    #[error("protocol token has not been set")]
    ProtocolTokenNotSet,

    #[error("protocol token is already set to {0}")]
    ProtocolTokenAlreadySet(String),

    // === Resource ===
    #[error("insufficient fee: paid {paid}, creation fee is {required}")]
    InsufficientFee { paid: u128, required: u128 },

    #[error("insufficient payment: paid {paid}, cost is {required}")]
    InsufficientPayment { paid: u128, required: u128 },

    #[error("insufficient shares: have {available}, need {requested}")]
    InsufficientShares { available: u128, requested: u128 },

    #[error("insufficient pool supply: supply {supply}, requested {requested}")]
    InsufficientPoolSupply { supply: u128, requested: u128 },

    #[error("caller holds no winning shares in market {0}")]
    NoWinningShares(MarketId),

    #[error("no winning shares exist in market {0}")]
    NoWinningSharesExist(MarketId),

    #[error("redemption amount rounds to zero")]
    AmountTooSmall,

    #[error("insufficient reward shares: have {available}, need {requested}")]
    InsufficientRewardShares { available: u128, requested: u128 },

    #[error("no reward shares have been issued")]
    NoSharesIssued,

    #[error("protocol token pool is empty")]
    EmptyProtocolPool,

    #[error("insufficient balance for {account}: have {available}, need {requested}")]
    InsufficientBalance {
        account: String,
        available: u128,
        requested: u128,
    },

    // === Internal ===
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        use MarketError::*;
        match self {
            InvalidShareAmount | InvalidPrice | ArrayLengthMismatch { .. } | InvalidAmount(_) => {
                ErrorKind::Validation
            }
            NotOwner(_) | NotAuthorized(_) => ErrorKind::Authorization,
            MarketNotFound(_)
            | AlreadySettled(_)
            | NotSettled(_)
            | TooEarly { .. }
            | MarketClosed(_)
            | OnlyWinnersCanSellAfterSettlement { .. }
            | ProtocolTokenNotSet
            | ProtocolTokenAlreadySet(_) => ErrorKind::State,
            InsufficientFee { .. }
            | InsufficientPayment { .. }
            | InsufficientShares { .. }
            | InsufficientPoolSupply { .. }
            | NoWinningShares(_)
            | NoWinningSharesExist(_)
            | AmountTooSmall
            | InsufficientRewardShares { .. }
            | NoSharesIssued
            | EmptyProtocolPool
            | InsufficientBalance { .. } => ErrorKind::Resource,
            ArithmeticOverflow => ErrorKind::Internal,
        }
    }
}

pub type MarketResult<T> = Result<T, MarketError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
