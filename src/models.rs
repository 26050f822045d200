// Request bodies and JSON helpers for the PumpDump HTTP API
//
// Amounts are 1e18-scaled integers. Requests accept them as JSON integers
// (up to u64) or as decimal strings; responses always render them as
// strings, next to a human readable decimal.

use rust_decimal::Decimal;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;

use crate::engine::{MarketView, OutcomeView};
use crate::events::Asset;
use crate::market_resolve::{
    ClaimReceipt, FeeSplit, MarketId, Outcome, TradeQuote, TradeReceipt, TradeSide,
};

/// Decimal places of fixed-point amounts
pub const AMOUNT_SCALE: u32 = 18;

// ===== REQUESTS =====

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMarketRequest {
    pub caller: String,
    pub token_address: String,
    #[serde(deserialize_with = "de_amount")]
    pub initial_price: u128,
    #[serde(default, deserialize_with = "de_amount")]
    pub payment: u128,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeRequest {
    pub caller: String,
    pub outcome: Outcome,
    #[serde(deserialize_with = "de_amount")]
    pub shares: u128,
    /// Attached payment; buys only
    #[serde(default, deserialize_with = "de_amount")]
    pub payment: u128,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettleRequest {
    pub caller: String,
    #[serde(deserialize_with = "de_amount")]
    pub final_price: u128,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchSettleRequest {
    pub caller: String,
    pub market_ids: Vec<MarketId>,
    #[serde(deserialize_with = "de_amounts")]
    pub final_prices: Vec<u128>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnsettledRequest {
    pub market_ids: Vec<MarketId>,
    /// Defaults to the current time
    #[serde(default)]
    pub now: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeBotRequest {
    pub caller: String,
    pub account: String,
    pub authorized: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimProtocolRequest {
    pub caller: String,
    #[serde(deserialize_with = "de_amount")]
    pub share_amount: u128,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetProtocolTokenRequest {
    pub caller: String,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositRequest {
    pub caller: String,
    #[serde(deserialize_with = "de_amount")]
    pub amount: u128,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FundRequest {
    pub caller: String,
    pub account: String,
    #[serde(default = "default_asset")]
    pub asset: Asset,
    #[serde(deserialize_with = "de_amount")]
    pub amount: u128,
}

fn default_asset() -> Asset {
    Asset::Currency
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferOwnershipRequest {
    pub caller: String,
    pub new_owner: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteQuery {
    pub side: TradeSide,
    pub outcome: Outcome,
    pub shares: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

// ===== AMOUNT PARSING =====

/// Parse a non-negative integer amount given as a string (underscores allowed)
pub fn parse_amount(raw: &str) -> Result<u128, String> {
    let cleaned = raw.trim().replace('_', "");
    cleaned
        .parse::<u128>()
        .map_err(|e| format!("invalid amount '{}': {}", raw, e))
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = u128;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer or an integer string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
        Ok(u128::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
        u128::try_from(v).map_err(|_| E::custom(format!("amount must not be negative, got {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
        parse_amount(v).map_err(E::custom)
    }
}

pub fn de_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    deserializer.deserialize_any(AmountVisitor)
}

struct AmountSeed;

impl<'de> de::DeserializeSeed<'de> for AmountSeed {
    type Value = u128;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<u128, D::Error> {
        de_amount(deserializer)
    }
}

pub fn de_amounts<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u128>, D::Error> {
    struct AmountsVisitor;

    impl<'de> Visitor<'de> for AmountsVisitor {
        type Value = Vec<u128>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of amounts")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<u128>, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(v) = seq.next_element_seed(AmountSeed)? {
                out.push(v);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_seq(AmountsVisitor)
}

// ===== RESPONSE RENDERING =====

/// Render a 1e18-scaled amount as a decimal string, e.g. "4.945"
pub fn format_amount(v: u128) -> String {
    i128::try_from(v)
        .ok()
        .and_then(|v| Decimal::try_from_i128_with_scale(v, AMOUNT_SCALE).ok())
        .map(|d| d.normalize().to_string())
        .unwrap_or_else(|| v.to_string())
}

/// `{ "raw": "...", "decimal": "..." }`
pub fn amount_json(v: u128) -> Value {
    json!({ "raw": v.to_string(), "decimal": format_amount(v) })
}

pub fn split_json(split: &FeeSplit) -> Value {
    json!({
        "gross": amount_json(split.gross),
        "creator_fee": amount_json(split.creator_fee),
        "platform_fee": amount_json(split.platform_fee),
        "net": amount_json(split.net),
    })
}

fn outcome_json(o: &OutcomeView) -> Value {
    json!({
        "outcome": o.outcome,
        "total_shares": o.total_shares.to_string(),
        "total_volume": amount_json(o.total_volume),
        "position_token": o.position_token,
    })
}

pub fn market_json(view: &MarketView) -> Value {
    json!({
        "id": view.id,
        "creator": view.creator,
        "token_address": view.token_address,
        "initial_price": amount_json(view.initial_price),
        "created_at": view.created_at,
        "settlement_time": view.settlement_time,
        "settlement_time_utc": utc(view.settlement_time),
        "status": view.status,
        "settled": view.settled,
        "winning_outcome": view.winning_outcome,
        "final_price": view.final_price.map(amount_json),
        "prize_pool": amount_json(view.prize_pool),
        "outcomes": view.outcomes.iter().map(outcome_json).collect::<Vec<_>>(),
    })
}

pub fn quote_json(quote: &TradeQuote) -> Value {
    json!({
        "side": quote.side,
        "outcome": quote.outcome,
        "shares": quote.shares.to_string(),
        "supply": quote.supply.to_string(),
        "price": split_json(&quote.split),
    })
}

pub fn trade_json(receipt: &TradeReceipt) -> Value {
    json!({
        "success": true,
        "market_id": receipt.market_id,
        "side": receipt.side,
        "outcome": receipt.outcome,
        "shares": receipt.shares.to_string(),
        "price": split_json(&receipt.split),
        "refund": amount_json(receipt.refund),
    })
}

pub fn claim_json(receipt: &ClaimReceipt) -> Value {
    json!({
        "success": true,
        "market_id": receipt.market_id,
        "outcome": receipt.outcome,
        "shares_burned": receipt.shares_burned.to_string(),
        "winnings": amount_json(receipt.winnings),
        "reward_bonus": amount_json(receipt.reward_bonus),
    })
}

/// RFC 3339 rendering of a unix timestamp
pub fn utc(ts: u64) -> Option<String> {
    i64::try_from(ts)
        .ok()
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(4_945_000_000_000_000_000), "4.945");
        assert_eq!(format_amount(1_000_000_000_000_000_000), "1");
        assert_eq!(format_amount(1), "0.000000000000000001");
        assert_eq!(format_amount(0), "0");
    }

    #[test]
    fn test_format_amount_matches_decimal() {
        use rust_decimal_macros::dec;
        assert_eq!(format_amount(1_500_000_000_000_000), dec!(0.0015).to_string());
        assert_eq!(format_amount(1_000 * 1_000_000_000_000_000_000), dec!(1000).to_string());
    }

    #[test]
    fn test_amounts_from_numbers_or_strings() {
        let req: TradeRequest = serde_json::from_str(
            r#"{ "caller": "ALICE", "outcome": "NO_CHANGE", "shares": 100, "payment": "5_000000000000000000" }"#,
        )
        .unwrap();
        assert_eq!(req.outcome, Outcome::NoChange);
        assert_eq!(req.shares, 100);
        assert_eq!(req.payment, 5_000_000_000_000_000_000);

        let req: BatchSettleRequest = serde_json::from_str(
            r#"{ "caller": "BOT", "market_ids": [0, 1], "final_prices": ["1150", 2000] }"#,
        )
        .unwrap();
        assert_eq!(req.final_prices, vec![1150, 2000]);

        assert!(serde_json::from_str::<SettleRequest>(r#"{ "caller": "BOT", "final_price": -1 }"#).is_err());
    }

    #[test]
    fn test_payment_defaults_to_zero() {
        let req: TradeRequest =
            serde_json::from_str(r#"{ "caller": "ALICE", "outcome": "RUG", "shares": "7" }"#).unwrap();
        assert_eq!(req.payment, 0);
    }

    #[test]
    fn test_utc_rendering() {
        assert_eq!(utc(1_700_006_400).as_deref(), Some("2023-11-15T00:00:00+00:00"));
    }
}
