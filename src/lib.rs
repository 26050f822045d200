//! PumpDump Prediction Market
//! Ledger and settlement engine for five-outcome token price markets,
//! exported as a library crate and served over HTTP by the binary.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod handlers;
pub mod ledger;
pub mod market_resolve;
pub mod math;
pub mod models;
pub mod routes;
pub mod shares;

pub use auth::AuthorizationRegistry;
pub use config::{Config, LoggingConfig};
pub use engine::{Call, EngineParams, MarketView, PredictionEngine, RewardTotals, UNIT};
pub use error::{ConfigError, ErrorKind, MarketError, MarketResult};
pub use events::{Asset, EventLog, EventRecord, Notification};
pub use ledger::{Ledger, Transaction, TransferPlan, TxType, ESCROW_ACCOUNT};

// Re-export from market_resolve (markets, pricing, settlement)
pub use market_resolve::{
    classify_outcome, settlement_time_for, BatchSettlementReport, BondingCurve, ClaimReceipt,
    FeeDistributor, FeeSplit, Market, MarketId, MarketRegistry, MarketStatus, Outcome,
    PositionTokenId, TradeQuote, TradeReceipt, TradeSide, OUTCOME_COUNT,
};

// Re-export from shares (balance ledgers and rewards)
pub use shares::{BalanceLedger, PositionBook, Redemption, RewardLedger, TokenLedger};
