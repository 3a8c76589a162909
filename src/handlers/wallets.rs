use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::AppState;
use crate::db::models::Wallet;
use crate::db::queries;
use crate::error::AppError;
use crate::handlers::Pagination;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct CreateWalletRequest {
    pub owner_id: String,
    #[serde(default)]
    pub initial_balance: i64,
}

pub async fn create_wallet(
    State(state): State<AppState>,
    Json(req): Json<CreateWalletRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_owner_id(&req.owner_id)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    if req.initial_balance < 0 {
        return Err(AppError::Validation(
            "initial_balance must not be negative".to_string(),
        ));
    }

    let wallet = Wallet::new(req.owner_id.trim().to_string(), req.initial_balance);
    let inserted = queries::insert_wallet(&state.db, &wallet)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::BadRequest(format!("wallet for {} already exists", wallet.owner_id))
            }
            _ => AppError::Database(e),
        })?;

    Ok((StatusCode::CREATED, Json(inserted)))
}

pub async fn list_wallets(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let wallets =
        queries::list_wallets(&state.db, pagination.limit(), pagination.offset()).await?;
    Ok(Json(wallets))
}

pub async fn get_wallet(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let wallet = queries::get_wallet(&state.db, &owner_id)
        .await?
        .ok_or(AppError::WalletNotFound { which: owner_id })?;

    Ok(Json(wallet))
}

pub async fn list_wallet_transactions(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let wallet = queries::get_wallet(&state.db, &owner_id)
        .await?
        .ok_or(AppError::WalletNotFound { which: owner_id })?;

    let entries =
        queries::list_entries(&state.db, wallet.id, pagination.limit(), pagination.offset())
            .await?;

    Ok(Json(entries))
}
