pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod services;
pub mod startup;
pub mod validation;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::gateway::DarajaClient;
use crate::services::SettlementEngine;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub gateway: DarajaClient,
    pub engine: SettlementEngine,
    pub callback_secret: Option<String>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/wallets",
            get(handlers::wallets::list_wallets).post(handlers::wallets::create_wallet),
        )
        .route("/wallets/:owner_id", get(handlers::wallets::get_wallet))
        .route(
            "/wallets/:owner_id/transactions",
            get(handlers::wallets::list_wallet_transactions),
        )
        .route("/payments", post(handlers::payments::pay))
        .route("/stk_push", post(handlers::stk::stk_push))
        .route("/callback", post(handlers::stk::callback))
        .route("/intents/:id", get(handlers::stk::get_intent))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
