// Routes module - wires every HTTP endpoint to its handler

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app_state::SharedState;
use crate::handlers::*;

/// Endpoint table printed at start-up
pub const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/markets", "List all markets"),
    ("POST", "/markets", "Create a market"),
    ("GET", "/markets/:id", "Market details"),
    ("GET", "/markets/:id/positions/:account", "Outcome balances of an account"),
    ("GET", "/markets/:id/quote", "Quote a buy or sell"),
    ("POST", "/markets/:id/buy", "Buy outcome shares"),
    ("POST", "/markets/:id/sell", "Sell outcome shares"),
    ("POST", "/markets/:id/settle", "Settle a market"),
    ("POST", "/markets/:id/claim", "Claim winnings"),
    ("POST", "/markets/batch-settle", "Settle several markets"),
    ("POST", "/markets/unsettled", "Markets ready to settle"),
    ("POST", "/bots", "Authorize or revoke a settlement bot"),
    ("GET", "/bots/:account", "Bot authorization status"),
    ("GET", "/rewards/:account", "Reward balance and pool totals"),
    ("POST", "/rewards/claim", "Redeem reward shares"),
    ("POST", "/rewards/protocol-token", "Set the protocol token"),
    ("POST", "/rewards/deposit", "Deposit into the protocol pool"),
    ("GET", "/balance/:account", "Currency and protocol balances"),
    ("POST", "/accounts/fund", "Fund an account (owner)"),
    ("GET", "/owner", "Current owner"),
    ("POST", "/owner", "Transfer ownership"),
    ("GET", "/events", "Recent activity"),
];

pub fn router(state: SharedState) -> Router {
    Router::new()
        // ===== MARKET ENDPOINTS =====
        .route("/markets", get(get_markets).post(create_market))
        .route("/markets/batch-settle", post(batch_settle))
        .route("/markets/unsettled", post(unsettled_markets))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/positions/:account", get(get_position))
        .route("/markets/:id/quote", get(quote))
        .route("/markets/:id/buy", post(buy_shares))
        .route("/markets/:id/sell", post(sell_shares))
        .route("/markets/:id/settle", post(settle_market))
        .route("/markets/:id/claim", post(claim_winnings))
        // ===== BOT ENDPOINTS =====
        .route("/bots", post(authorize_bot))
        .route("/bots/:account", get(get_bot))
        // ===== REWARD ENDPOINTS =====
        .route("/rewards/claim", post(claim_protocol_tokens))
        .route("/rewards/protocol-token", post(set_protocol_token))
        .route("/rewards/deposit", post(deposit_protocol_tokens))
        .route("/rewards/:account", get(get_rewards))
        // ===== ACCOUNT ENDPOINTS =====
        .route("/balance/:account", get(get_balance))
        .route("/accounts/fund", post(fund_account))
        .route("/owner", get(get_owner).post(transfer_ownership))
        // ===== ACTIVITY =====
        .route("/events", get(get_events))
        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
