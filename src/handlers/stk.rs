use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use crate::AppState;
use crate::db::models::PaymentIntent;
use crate::db::queries;
use crate::error::AppError;
use crate::gateway::StkPushResponse;
use crate::gateway::callback::CallbackEnvelope;
use crate::services::settlement::CallbackDisposition;
use crate::validation;

const SIGNATURE_HEADER: &str = "x-callback-signature";

#[derive(Debug, Deserialize)]
pub struct StkPushRequest {
    pub owner_id: String,
    pub phone_number: String,
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct StkPushResult {
    pub intent_id: Uuid,
    pub status: String,
    pub phone_number: String,
    pub gateway: StkPushResponse,
}

/// Ask the gateway to prompt the customer's phone for payment. The
/// wallet is only credited later, when the result callback arrives.
pub async fn stk_push(
    State(state): State<AppState>,
    Json(req): Json<StkPushRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_owner_id(&req.owner_id)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    validation::validate_amount(req.amount).map_err(|_| AppError::InvalidAmount)?;
    let phone = validation::normalize_msisdn(&req.phone_number)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let owner_id = req.owner_id.trim().to_string();
    let reference = format!("USER-{owner_id}");

    let push = state
        .gateway
        .stk_push(&phone, req.amount, &reference, "Wallet top-up")
        .await?;

    let intent = PaymentIntent::new(
        owner_id,
        phone.clone(),
        req.amount,
        Some(push.merchant_request_id.clone()),
        Some(push.checkout_request_id.clone()),
    );
    let inserted = queries::insert_intent(&state.db, &intent).await?;

    tracing::info!(
        intent_id = %inserted.id,
        checkout_request_id = %push.checkout_request_id,
        "initiated STK push"
    );

    Ok((
        StatusCode::CREATED,
        Json(StkPushResult {
            intent_id: inserted.id,
            status: inserted.status,
            phone_number: phone,
            gateway: push,
        }),
    ))
}

/// Receive the asynchronous payment result from the gateway. Delivery is
/// at-least-once, so the engine deduplicates by CheckoutRequestID; every
/// accepted notification is answered with 200 so the gateway stops
/// retrying.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    if let Some(secret) = &state.callback_secret {
        let provided = headers
            .get(SIGNATURE_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing callback signature".to_string()))?;
        if !verify_signature(secret, body.as_bytes(), provided) {
            return Err(AppError::Unauthorized("invalid callback signature".to_string()));
        }
    }

    let envelope: CallbackEnvelope = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid callback body: {e}")))?;

    let disposition = state
        .engine
        .apply_gateway_result(&envelope.body.stk_callback)
        .await?;

    let response = match disposition {
        CallbackDisposition::Credited(outcome) => json!({
            "message": "Wallet updated",
            "owner_id": outcome.owner_id,
            "net_amount": outcome.net_amount,
            "commission": outcome.commission,
        }),
        CallbackDisposition::Failed { code, description } => json!({
            "message": "Payment failed",
            "result_code": code,
            "details": description,
        }),
        CallbackDisposition::Duplicate => json!({
            "message": "Duplicate notification ignored",
        }),
        CallbackDisposition::Unknown => json!({
            "message": "Unknown payment intent ignored",
        }),
    };

    Ok(Json(response))
}

pub async fn get_intent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let intent = queries::get_intent(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment intent {id} not found")))?;

    Ok(Json(intent))
}

/// HMAC-SHA256 over the raw request body, hex-encoded.
fn verify_signature(secret: &str, body: &[u8], provided: &str) -> bool {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());
    expected.eq_ignore_ascii_case(provided.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"Body":{}}"#;
        let sig = sign("topsecret", body);
        assert!(verify_signature("topsecret", body, &sig));
        assert!(verify_signature("topsecret", body, &sig.to_uppercase()));
    }

    #[test]
    fn rejects_tampered_body_or_wrong_secret() {
        let body = br#"{"Body":{}}"#;
        let sig = sign("topsecret", body);
        assert!(!verify_signature("topsecret", b"{}", &sig));
        assert!(!verify_signature("othersecret", body, &sig));
        assert!(!verify_signature("topsecret", body, "deadbeef"));
    }
}
