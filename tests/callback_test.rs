mod common;

use common::*;
use hmac::{Hmac, Mac};
use pesabridge::db::models::PaymentIntent;
use pesabridge::db::queries;
use reqwest::StatusCode;
use serde_json::json;
use sha2::Sha256;

async fn insert_pending_intent(pool: &sqlx::PgPool, owner_id: &str, checkout_id: &str, amount: i64) {
    let intent = PaymentIntent::new(
        owner_id.to_string(),
        "254712345678".to_string(),
        amount,
        Some("29115-34620561-1".to_string()),
        Some(checkout_id.to_string()),
    );
    queries::insert_intent(pool, &intent).await.unwrap();
}

fn success_callback(checkout_id: &str, amount: i64) -> serde_json::Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout_id,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        {"Name": "Amount", "Value": amount},
                        {"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"},
                        {"Name": "PhoneNumber", "Value": 254712345678i64}
                    ]
                }
            }
        }
    })
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn successful_callback_credits_wallet_with_commission_split() {
    let (base_url, pool, _container) = setup_test_app(None).await;
    let client = reqwest::Client::new();

    insert_pending_intent(&pool, "customer-1", "ws_CO_1", 1000).await;

    let res = client
        .post(format!("{}/callback", base_url))
        .json(&success_callback("ws_CO_1", 1000))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Wallet updated");
    assert_eq!(body["net_amount"], 900);
    assert_eq!(body["commission"], 100);

    // Wallet was provisioned on first use and credited net of commission.
    assert_eq!(wallet_balance(&pool, "customer-1").await, 900);
    assert_eq!(wallet_balance(&pool, PLATFORM).await, 100);

    let status: String =
        sqlx::query_scalar("SELECT status FROM payment_intents WHERE checkout_request_id = $1")
            .bind("ws_CO_1")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "succeeded");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn redelivered_callback_is_acknowledged_but_credits_nothing() {
    let (base_url, pool, _container) = setup_test_app(None).await;
    let client = reqwest::Client::new();

    insert_pending_intent(&pool, "customer-2", "ws_CO_2", 1000).await;

    for expected_message in ["Wallet updated", "Duplicate notification ignored"] {
        let res = client
            .post(format!("{}/callback", base_url))
            .json(&success_callback("ws_CO_2", 1000))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["message"], expected_message);
    }

    assert_eq!(wallet_balance(&pool, "customer-2").await, 900);
    assert_eq!(wallet_balance(&pool, PLATFORM).await, 100);
    assert_eq!(ledger_count(&pool).await, 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn failed_callback_marks_intent_failed_without_credit() {
    let (base_url, pool, _container) = setup_test_app(None).await;
    let client = reqwest::Client::new();

    insert_pending_intent(&pool, "customer-3", "ws_CO_3", 1000).await;

    let res = client
        .post(format!("{}/callback", base_url))
        .json(&json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": "ws_CO_3",
                    "ResultCode": 1032,
                    "ResultDesc": "Request cancelled by user."
                }
            }
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Payment failed");
    assert_eq!(body["result_code"], 1032);

    let status: String =
        sqlx::query_scalar("SELECT status FROM payment_intents WHERE checkout_request_id = $1")
            .bind("ws_CO_3")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "failed");
    assert_eq!(ledger_count(&pool).await, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn callback_for_unknown_intent_is_ignored() {
    let (base_url, pool, _container) = setup_test_app(None).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/callback", base_url))
        .json(&success_callback("ws_CO_unknown", 500))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Unknown payment intent ignored");
    assert_eq!(ledger_count(&pool).await, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn callback_signature_is_enforced_when_secret_is_configured() {
    let secret = "webhook-secret".to_string();
    let (base_url, pool, _container) = setup_test_app(Some(secret.clone())).await;
    let client = reqwest::Client::new();

    insert_pending_intent(&pool, "customer-4", "ws_CO_4", 500).await;
    let body = success_callback("ws_CO_4", 500).to_string();

    // No signature header.
    let res = client
        .post(format!("{}/callback", base_url))
        .header("content-type", "application/json")
        .body(body.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Valid signature over the raw body.
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let res = client
        .post(format!("{}/callback", base_url))
        .header("content-type", "application/json")
        .header("x-callback-signature", signature)
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(wallet_balance(&pool, "customer-4").await, 450);
}
