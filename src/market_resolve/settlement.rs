use alloy_primitives::U256;
use serde::Serialize;
use tracing::{debug, warn};

use super::{MarketId, Outcome};
use crate::engine::{Call, PredictionEngine};
use crate::error::{MarketError, MarketResult};
use crate::events::Notification;

// ============================================================================
// OUTCOME CLASSIFICATION
// ============================================================================

/// Classify a final price against the initial one.
///
/// Bands are checked MOON, PUMP, RUG, DUMP, then NO_CHANGE; the first match
/// wins. Thresholds are `initial * pct / 100` with truncating division,
/// computed in 256 bits so every accepted initial price classifies.
pub fn classify_outcome(initial_price: u128, final_price: u128) -> Outcome {
    let initial = U256::from(initial_price);
    let threshold = |pct: u64| initial * U256::from(pct) / U256::from(100u64);
    let final_price = U256::from(final_price);

    if final_price >= threshold(150) {
        Outcome::Moon
    } else if final_price >= threshold(110) {
        Outcome::Pump
    } else if final_price <= threshold(50) {
        Outcome::Rug
    } else if final_price <= threshold(90) {
        Outcome::Dump
    } else {
        Outcome::NoChange
    }
}

// ============================================================================
// BATCH REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettledMarket {
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub final_price: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMarket {
    pub market_id: MarketId,
    pub reason: String,
}

/// What a batch call actually did, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSettlementReport {
    pub settled: Vec<SettledMarket>,
    pub skipped: Vec<SkippedMarket>,
}

impl BatchSettlementReport {
    pub fn success_count(&self) -> usize {
        self.settled.len()
    }
}

// ============================================================================
// SETTLEMENT
// ============================================================================

impl PredictionEngine {
    /// Settle one market at `final_price` (owner or allow-listed bot)
    pub fn settle_market(&mut self, call: &Call, id: MarketId, final_price: u128) -> MarketResult<Outcome> {
        call.ensure_no_value()?;
        self.auth.require_settler(&call.caller)?;
        self.settle_one(id, final_price, call.timestamp)
    }

    /// Settle several markets; ineligible entries are skipped, not fatal
    pub fn batch_settle_markets(
        &mut self,
        call: &Call,
        ids: &[MarketId],
        final_prices: &[u128],
    ) -> MarketResult<BatchSettlementReport> {
        call.ensure_no_value()?;
        self.auth.require_settler(&call.caller)?;
        if ids.len() != final_prices.len() {
            return Err(MarketError::ArrayLengthMismatch {
                ids: ids.len(),
                prices: final_prices.len(),
            });
        }

        let mut report = BatchSettlementReport::default();
        for (&market_id, &final_price) in ids.iter().zip(final_prices) {
            match self.settle_one(market_id, final_price, call.timestamp) {
                Ok(outcome) => report.settled.push(SettledMarket {
                    market_id,
                    outcome,
                    final_price,
                }),
                Err(err) => {
                    match err {
                        MarketError::AlreadySettled(_) | MarketError::TooEarly { .. } => {
                            debug!(market_id, %err, "batch settlement skipped market");
                        }
                        _ => warn!(market_id, %err, "batch settlement skipped market"),
                    }
                    report.skipped.push(SkippedMarket {
                        market_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        self.events.emit(
            Notification::BatchSettlement {
                market_ids: ids.to_vec(),
                success_count: report.success_count(),
            },
            call.timestamp,
        );
        Ok(report)
    }

    /// Order-preserving subset of `ids` that exist, are unsettled and whose
    /// settlement time has passed
    pub fn unsettled_markets(&self, ids: &[MarketId], now: u64) -> Vec<MarketId> {
        ids.iter()
            .copied()
            .filter(|&id| self.markets.get(id).is_some_and(|m| m.is_ready(now)))
            .collect()
    }

    fn settle_one(&mut self, id: MarketId, final_price: u128, now: u64) -> MarketResult<Outcome> {
        let market = self.markets.require_mut(id)?;
        if market.is_settled() {
            return Err(MarketError::AlreadySettled(id));
        }
        if now < market.settlement_time {
            return Err(MarketError::TooEarly {
                market_id: id,
                settlement_time: market.settlement_time,
                now,
            });
        }

        let outcome = classify_outcome(market.initial_price, final_price);
        market.settle(outcome, final_price, now)?;

        self.events.emit(
            Notification::MarketSettled {
                market_id: id,
                outcome,
                final_price,
            },
            now,
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineParams, DEFAULT_CREATION_FEE, UNIT};
    use crate::events::Asset;

    const T0: u64 = 1_700_000_000;
    const CLOSE: u64 = 1_700_006_400;

    fn engine_with_markets(n: usize) -> PredictionEngine {
        let mut engine = PredictionEngine::new("OWNER", EngineParams::default());
        engine
            .fund_account(&Call::new("OWNER", T0), "CREATOR", Asset::Currency, UNIT)
            .unwrap();
        for _ in 0..n {
            engine
                .create_market(&Call::new("CREATOR", T0).with_value(DEFAULT_CREATION_FEE), "0xtoken", 1000)
                .unwrap();
        }
        engine
    }

    #[test]
    fn test_classification_bands() {
        let cases = [
            (1150, Outcome::Pump),
            (2000, Outcome::Moon),
            (850, Outcome::Dump),
            (100, Outcome::Rug),
            (1005, Outcome::NoChange),
            // Band edges
            (1500, Outcome::Moon),
            (1499, Outcome::Pump),
            (1100, Outcome::Pump),
            (1099, Outcome::NoChange),
            (901, Outcome::NoChange),
            (900, Outcome::Dump),
            (501, Outcome::Dump),
            (500, Outcome::Rug),
            (0, Outcome::Rug),
        ];
        for (final_price, expected) in cases {
            assert_eq!(classify_outcome(1000, final_price), expected, "price {}", final_price);
        }
    }

    #[test]
    fn test_classification_truncates_thresholds() {
        // 15 * 150 / 100 = 22, 15 * 110 / 100 = 16
        assert_eq!(classify_outcome(15, 22), Outcome::Moon);
        assert_eq!(classify_outcome(15, 16), Outcome::Pump);
    }

    #[test]
    fn test_classification_at_extreme_prices() {
        assert_eq!(classify_outcome(u128::MAX, u128::MAX), Outcome::NoChange);
        assert_eq!(classify_outcome(u128::MAX, u128::MAX / 2), Outcome::Rug);
        assert_eq!(classify_outcome(u128::MAX, u128::MAX / 10 * 9), Outcome::Dump);
        assert_eq!(classify_outcome(u128::MAX / 100, u128::MAX), Outcome::Moon);
        assert_eq!(classify_outcome(1, u128::MAX), Outcome::Moon);
    }

    #[test]
    fn test_settles_at_largest_initial_price() {
        let mut engine = PredictionEngine::new("OWNER", EngineParams::default());
        engine
            .fund_account(&Call::new("OWNER", T0), "CREATOR", Asset::Currency, UNIT)
            .unwrap();
        let id = engine
            .create_market(&Call::new("CREATOR", T0).with_value(DEFAULT_CREATION_FEE), "0xwhale", u128::MAX)
            .unwrap();
        let cost = engine.quote_buy(id, Outcome::NoChange, 10).unwrap().split.gross;
        engine
            .buy_shares(&Call::new("CREATOR", T0).with_value(cost), id, Outcome::NoChange, 10)
            .unwrap();

        let outcome = engine
            .settle_market(&Call::new("OWNER", CLOSE), id, u128::MAX - 1)
            .unwrap();
        assert_eq!(outcome, Outcome::NoChange);

        let pool = engine.market(id).unwrap().prize_pool().unwrap();
        let receipt = engine.claim_winnings(&Call::new("CREATOR", CLOSE), id).unwrap();
        assert_eq!(receipt.winnings, pool);
    }

    #[test]
    fn test_settle_checks() {
        let mut engine = engine_with_markets(1);
        assert_eq!(
            engine.settle_market(&Call::new("BOT", CLOSE), 0, 1150).unwrap_err(),
            MarketError::NotAuthorized("BOT".into())
        );
        assert_eq!(
            engine.settle_market(&Call::new("OWNER", CLOSE), 5, 1150).unwrap_err(),
            MarketError::MarketNotFound(5)
        );
        assert_eq!(
            engine.settle_market(&Call::new("OWNER", CLOSE - 1), 0, 1150).unwrap_err(),
            MarketError::TooEarly {
                market_id: 0,
                settlement_time: CLOSE,
                now: CLOSE - 1
            }
        );

        assert_eq!(engine.settle_market(&Call::new("OWNER", CLOSE), 0, 1150).unwrap(), Outcome::Pump);
        assert_eq!(
            engine.settle_market(&Call::new("OWNER", CLOSE), 0, 100).unwrap_err(),
            MarketError::AlreadySettled(0)
        );
        assert_eq!(engine.market(0).unwrap().final_price(), Some(1150));
    }

    #[test]
    fn test_batch_skips_ineligible() {
        let mut engine = engine_with_markets(2);
        engine.settle_market(&Call::new("OWNER", CLOSE), 1, 2000).unwrap();

        let report = engine
            .batch_settle_markets(&Call::new("OWNER", CLOSE), &[0, 1, 7], &[850, 100, 1000])
            .unwrap();
        assert_eq!(report.success_count(), 1);
        assert_eq!(report.settled[0].outcome, Outcome::Dump);
        let skipped: Vec<_> = report.skipped.iter().map(|s| s.market_id).collect();
        assert_eq!(skipped, vec![1, 7]);
        assert_eq!(engine.market(1).unwrap().winning_outcome(), Some(Outcome::Moon));
    }

    #[test]
    fn test_batch_length_mismatch() {
        let mut engine = engine_with_markets(2);
        assert_eq!(
            engine
                .batch_settle_markets(&Call::new("OWNER", CLOSE), &[0, 1], &[1000])
                .unwrap_err(),
            MarketError::ArrayLengthMismatch { ids: 2, prices: 1 }
        );
        assert!(!engine.market(0).unwrap().is_settled());
        assert!(!engine.market(1).unwrap().is_settled());
    }

    #[test]
    fn test_unsettled_filter() {
        let mut engine = engine_with_markets(3);
        assert!(engine.unsettled_markets(&[0, 1, 2], CLOSE - 1).is_empty());

        engine.settle_market(&Call::new("OWNER", CLOSE), 1, 1000).unwrap();
        assert_eq!(engine.unsettled_markets(&[2, 1, 9, 0], CLOSE), vec![2, 0]);
    }
}
