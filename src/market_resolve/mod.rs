// ============================================================================
// Market Resolve Module - Core Market & Settlement Logic
// ============================================================================
//
// This module contains the core prediction market functionality:
//   - markets: Market records, outcomes, registry and settlement time
//   - curve: Linear bonding curve pricing outcome shares
//   - fees: Creator/platform fee split and routing
//   - trading: Buy, sell, quotes and prize claims
//   - settlement: Outcome classification, single and batch settlement
//
// ============================================================================

pub mod curve;
pub mod fees;
pub mod markets;
pub mod settlement;
pub mod trading;

pub use curve::*;
pub use fees::*;
pub use markets::*;
pub use settlement::*;
pub use trading::*;
