use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub buyer_id: String,
    pub seller_id: String,
    pub amount: i64,
    pub description: Option<String>,
}

/// Settle a service payment: debit the buyer, credit the seller net of
/// commission, credit the platform with the commission.
pub async fn pay(
    State(state): State<AppState>,
    Json(req): Json<PaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_owner_id(&req.buyer_id)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    validation::validate_owner_id(&req.seller_id)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let description = match &req.description {
        Some(raw) => {
            let cleaned = validation::validate_description(raw)
                .map_err(|e| AppError::Validation(e.to_string()))?;
            if cleaned.is_empty() { None } else { Some(cleaned) }
        }
        None => None,
    };

    let outcome = state
        .engine
        .settle_payment(
            req.buyer_id.trim(),
            req.seller_id.trim(),
            req.amount,
            description.as_deref(),
        )
        .await?;

    Ok(Json(outcome))
}
