// HTTP request handlers for the PumpDump API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::app_state::SharedState;
use crate::engine::Call;
use crate::error::{ErrorKind, MarketError};
use crate::events::EventRecord;
use crate::market_resolve::{MarketId, TradeSide};
use crate::models::*;

/// Default and maximum page size for `/events`
const DEFAULT_EVENT_LIMIT: usize = 50;
const MAX_EVENT_LIMIT: usize = 1000;

// ===== ERRORS =====

/// Engine error rendered as `{ success: false, error, kind }`
#[derive(Debug)]
pub struct ApiError(pub MarketError);

impl From<MarketError> for ApiError {
    fn from(err: MarketError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if let MarketError::MarketNotFound(_) = self.0 {
            return StatusCode::NOT_FOUND;
        }
        match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::State => StatusCode::CONFLICT,
            ErrorKind::Resource => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), kind = ?self.0.kind(), error = %self.0, "request rejected");
        let body = Json(json!({
            "success": false,
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        }));
        (status, body).into_response()
    }
}

pub type ApiResult = Result<Json<Value>, ApiError>;

/// Current unix time in seconds
fn now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

// ===== HEALTH =====

pub async fn health_check() -> &'static str {
    "PumpDump Prediction Market - Online ✅"
}

// ===== MARKETS =====

pub async fn get_markets(State(state): State<SharedState>) -> ApiResult {
    let app_state = state.lock();
    let markets = app_state.engine.list_markets(now())?;
    Ok(Json(json!({
        "count": markets.len(),
        "markets": markets.iter().map(market_json).collect::<Vec<_>>(),
    })))
}

pub async fn get_market(State(state): State<SharedState>, Path(id): Path<MarketId>) -> ApiResult {
    let app_state = state.lock();
    let view = app_state.engine.market_view(id, now())?;
    Ok(Json(market_json(&view)))
}

pub async fn create_market(
    State(state): State<SharedState>,
    Json(payload): Json<CreateMarketRequest>,
) -> ApiResult {
    let mut app_state = state.lock();
    let call = Call::new(payload.caller, now()).with_value(payload.payment);
    let market_id = app_state
        .engine
        .create_market(&call, &payload.token_address, payload.initial_price)?;
    let view = app_state.engine.market_view(market_id, call.timestamp)?;
    Ok(Json(json!({
        "success": true,
        "market_id": market_id,
        "market": market_json(&view),
    })))
}

pub async fn get_position(
    State(state): State<SharedState>,
    Path((id, account)): Path<(MarketId, String)>,
) -> ApiResult {
    let app_state = state.lock();
    let market = app_state.engine.market(id)?;
    let balances = app_state.engine.position(id, &account)?;
    let positions: Vec<Value> = market
        .position_tokens
        .iter()
        .zip(balances)
        .enumerate()
        .map(|(i, (token, balance))| {
            json!({
                "outcome": crate::market_resolve::Outcome::ALL[i],
                "position_token": token.as_str(),
                "shares": balance.to_string(),
            })
        })
        .collect();
    Ok(Json(json!({ "market_id": id, "account": account, "positions": positions })))
}

pub async fn quote(
    State(state): State<SharedState>,
    Path(id): Path<MarketId>,
    Query(query): Query<QuoteQuery>,
) -> ApiResult {
    let app_state = state.lock();
    let shares = u128::from(query.shares);
    let quote = match query.side {
        TradeSide::Buy => app_state.engine.quote_buy(id, query.outcome, shares)?,
        TradeSide::Sell => app_state.engine.quote_sell(id, query.outcome, shares)?,
    };
    Ok(Json(quote_json(&quote)))
}

pub async fn buy_shares(
    State(state): State<SharedState>,
    Path(id): Path<MarketId>,
    Json(payload): Json<TradeRequest>,
) -> ApiResult {
    let mut app_state = state.lock();
    let call = Call::new(payload.caller, now()).with_value(payload.payment);
    let receipt = app_state.engine.buy_shares(&call, id, payload.outcome, payload.shares)?;
    Ok(Json(trade_json(&receipt)))
}

pub async fn sell_shares(
    State(state): State<SharedState>,
    Path(id): Path<MarketId>,
    Json(payload): Json<TradeRequest>,
) -> ApiResult {
    let mut app_state = state.lock();
    let call = Call::new(payload.caller, now()).with_value(payload.payment);
    let receipt = app_state.engine.sell_shares(&call, id, payload.outcome, payload.shares)?;
    Ok(Json(trade_json(&receipt)))
}

// ===== SETTLEMENT =====

pub async fn settle_market(
    State(state): State<SharedState>,
    Path(id): Path<MarketId>,
    Json(payload): Json<SettleRequest>,
) -> ApiResult {
    let mut app_state = state.lock();
    let call = Call::new(payload.caller, now());
    let outcome = app_state.engine.settle_market(&call, id, payload.final_price)?;
    Ok(Json(json!({
        "success": true,
        "market_id": id,
        "outcome": outcome,
        "final_price": amount_json(payload.final_price),
    })))
}

pub async fn batch_settle(
    State(state): State<SharedState>,
    Json(payload): Json<BatchSettleRequest>,
) -> ApiResult {
    let mut app_state = state.lock();
    let call = Call::new(payload.caller, now());
    let report = app_state
        .engine
        .batch_settle_markets(&call, &payload.market_ids, &payload.final_prices)?;
    let settled: Vec<Value> = report
        .settled
        .iter()
        .map(|s| {
            json!({
                "market_id": s.market_id,
                "outcome": s.outcome,
                "final_price": amount_json(s.final_price),
            })
        })
        .collect();
    Ok(Json(json!({
        "success": true,
        "success_count": report.success_count(),
        "settled": settled,
        "skipped": report.skipped,
    })))
}

pub async fn unsettled_markets(
    State(state): State<SharedState>,
    Json(payload): Json<UnsettledRequest>,
) -> ApiResult {
    let app_state = state.lock();
    let at = payload.now.unwrap_or_else(now);
    let ids = app_state.engine.unsettled_markets(&payload.market_ids, at);
    Ok(Json(json!({ "now": at, "market_ids": ids })))
}

pub async fn claim_winnings(
    State(state): State<SharedState>,
    Path(id): Path<MarketId>,
    Json(payload): Json<CallerRequest>,
) -> ApiResult {
    let mut app_state = state.lock();
    let call = Call::new(payload.caller, now());
    let receipt = app_state.engine.claim_winnings(&call, id)?;
    Ok(Json(claim_json(&receipt)))
}

// ===== BOTS =====

pub async fn authorize_bot(
    State(state): State<SharedState>,
    Json(payload): Json<AuthorizeBotRequest>,
) -> ApiResult {
    let mut app_state = state.lock();
    let call = Call::new(payload.caller, now());
    app_state
        .engine
        .authorize_bot(&call, &payload.account, payload.authorized)?;
    Ok(Json(json!({
        "success": true,
        "account": payload.account,
        "authorized": payload.authorized,
    })))
}

pub async fn get_bot(State(state): State<SharedState>, Path(account): Path<String>) -> Json<Value> {
    let app_state = state.lock();
    let authorized = app_state.engine.is_authorized_bot(&account);
    Json(json!({ "account": account, "authorized": authorized }))
}

// ===== REWARDS =====

pub async fn get_rewards(State(state): State<SharedState>, Path(account): Path<String>) -> Json<Value> {
    let app_state = state.lock();
    let engine = &app_state.engine;
    let totals = engine.reward_totals();
    Json(json!({
        "account": account,
        "balance": amount_json(engine.reward_balance(&account)),
        "total_shares_issued": amount_json(totals.total_shares_issued),
        "protocol_token_balance": amount_json(totals.protocol_token_balance),
        "protocol_token": totals.protocol_token,
    }))
}

pub async fn claim_protocol_tokens(
    State(state): State<SharedState>,
    Json(payload): Json<ClaimProtocolRequest>,
) -> ApiResult {
    let mut app_state = state.lock();
    let call = Call::new(payload.caller, now());
    let redemption = app_state.engine.claim_protocol_tokens(&call, payload.share_amount)?;
    Ok(Json(json!({
        "success": true,
        "burned": amount_json(redemption.burned),
        "received": amount_json(redemption.received),
    })))
}

pub async fn set_protocol_token(
    State(state): State<SharedState>,
    Json(payload): Json<SetProtocolTokenRequest>,
) -> ApiResult {
    let mut app_state = state.lock();
    let call = Call::new(payload.caller, now());
    app_state.engine.set_protocol_token(&call, &payload.token)?;
    Ok(Json(json!({ "success": true, "protocol_token": payload.token.trim() })))
}

pub async fn deposit_protocol_tokens(
    State(state): State<SharedState>,
    Json(payload): Json<DepositRequest>,
) -> ApiResult {
    let mut app_state = state.lock();
    let call = Call::new(payload.caller, now());
    app_state.engine.deposit_protocol_tokens(&call, payload.amount)?;
    let pool = app_state.engine.reward_totals().protocol_token_balance;
    Ok(Json(json!({
        "success": true,
        "deposited": amount_json(payload.amount),
        "protocol_token_balance": amount_json(pool),
    })))
}

// ===== ACCOUNTS =====

pub async fn get_balance(State(state): State<SharedState>, Path(account): Path<String>) -> Json<Value> {
    let app_state = state.lock();
    let engine = &app_state.engine;
    Json(json!({
        "account": account,
        "balance": amount_json(engine.currency_balance(&account)),
        "protocol_asset": amount_json(engine.protocol_asset_balance(&account)),
        "recent_transactions": engine
            .currency_transactions(&account, 20)
            .iter()
            .map(|tx| json!({
                "id": tx.id,
                "type": tx.tx_type,
                "from": tx.from,
                "to": tx.to,
                "amount": amount_json(tx.amount),
                "market_id": tx.market_id,
                "timestamp": tx.timestamp,
            }))
            .collect::<Vec<_>>(),
    }))
}

pub async fn fund_account(
    State(state): State<SharedState>,
    Json(payload): Json<FundRequest>,
) -> ApiResult {
    let mut app_state = state.lock();
    let call = Call::new(payload.caller, now());
    let tx = app_state
        .engine
        .fund_account(&call, &payload.account, payload.asset, payload.amount)?;
    Ok(Json(json!({
        "success": true,
        "transaction_id": tx.id,
        "account": payload.account,
        "asset": payload.asset,
        "amount": amount_json(payload.amount),
    })))
}

pub async fn transfer_ownership(
    State(state): State<SharedState>,
    Json(payload): Json<TransferOwnershipRequest>,
) -> ApiResult {
    let mut app_state = state.lock();
    let call = Call::new(payload.caller, now());
    app_state.engine.transfer_ownership(&call, &payload.new_owner)?;
    Ok(Json(json!({ "success": true, "owner": app_state.engine.owner() })))
}

pub async fn get_owner(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock();
    Json(json!({ "owner": app_state.engine.owner() }))
}

// ===== ACTIVITY =====

#[derive(Serialize)]
pub struct EventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

pub async fn get_events(
    State(state): State<SharedState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let app_state = state.lock();
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT).min(MAX_EVENT_LIMIT);
    let events: Vec<EventRecord> = app_state
        .engine
        .recent_events(limit)
        .into_iter()
        .cloned()
        .collect();
    Json(EventsResponse {
        count: events.len(),
        events,
    })
}
