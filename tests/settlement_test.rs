mod common;

use common::*;
use pesabridge::services::SettlementEngine;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "requires Docker"]
async fn settlement_splits_commission_between_seller_and_platform() {
    let (base_url, pool, _container) = setup_test_app(None).await;
    let client = reqwest::Client::new();

    create_wallet(&base_url, "buyer-1", 1000).await;
    create_wallet(&base_url, "seller-1", 0).await;

    let res = client
        .post(format!("{}/payments", base_url))
        .json(&json!({
            "buyer_id": "buyer-1",
            "seller_id": "seller-1",
            "amount": 500,
            "description": "Gardening service"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let outcome: serde_json::Value = res.json().await.unwrap();
    assert_eq!(outcome["gross_amount"], 500);
    assert_eq!(outcome["net_amount"], 450);
    assert_eq!(outcome["commission"], 50);
    assert_eq!(outcome["buyer_id"], "buyer-1");
    assert_eq!(outcome["seller_id"], "seller-1");

    assert_eq!(wallet_balance(&pool, "buyer-1").await, 500);
    assert_eq!(wallet_balance(&pool, "seller-1").await, 450);
    assert_eq!(wallet_balance(&pool, PLATFORM).await, 50);

    // Exactly three ledger rows, one per movement.
    assert_eq!(ledger_count(&pool).await, 3);

    let res = client
        .get(format!("{}/wallets/buyer-1/transactions", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let entries: serde_json::Value = res.json().await.unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["direction"], "debit");
    assert_eq!(entries[0]["amount"], 500);
    assert_eq!(entries[0]["description"], "Gardening service");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn insufficient_funds_leaves_everything_unchanged() {
    let (base_url, pool, _container) = setup_test_app(None).await;
    let client = reqwest::Client::new();

    create_wallet(&base_url, "buyer-2", 100).await;
    create_wallet(&base_url, "seller-2", 0).await;

    let res = client
        .post(format!("{}/payments", base_url))
        .json(&json!({
            "buyer_id": "buyer-2",
            "seller_id": "seller-2",
            "amount": 500
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_funds");

    assert_eq!(wallet_balance(&pool, "buyer-2").await, 100);
    assert_eq!(wallet_balance(&pool, "seller-2").await, 0);
    assert_eq!(wallet_balance(&pool, PLATFORM).await, 0);
    assert_eq!(ledger_count(&pool).await, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn missing_seller_fails_without_side_effects() {
    let (base_url, pool, _container) = setup_test_app(None).await;
    let client = reqwest::Client::new();

    create_wallet(&base_url, "buyer-3", 1000).await;

    let res = client
        .post(format!("{}/payments", base_url))
        .json(&json!({
            "buyer_id": "buyer-3",
            "seller_id": "ghost",
            "amount": 200
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "wallet_not_found");
    assert_eq!(body["message"], "seller wallet not found");

    assert_eq!(wallet_balance(&pool, "buyer-3").await, 1000);
    assert_eq!(ledger_count(&pool).await, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn non_positive_amounts_are_rejected() {
    let (base_url, _pool, _container) = setup_test_app(None).await;
    let client = reqwest::Client::new();

    create_wallet(&base_url, "buyer-4", 1000).await;
    create_wallet(&base_url, "seller-4", 0).await;

    for amount in [0i64, -50] {
        let res = client
            .post(format!("{}/payments", base_url))
            .json(&json!({
                "buyer_id": "buyer-4",
                "seller_id": "seller-4",
                "amount": amount
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "invalid_amount");
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn concurrent_settlements_never_overdraw_the_buyer() {
    let (base_url, pool, _container) = setup_test_app(None).await;

    create_wallet(&base_url, "buyer-5", 1000).await;
    create_wallet(&base_url, "seller-5", 0).await;

    let engine = SettlementEngine::new(pool.clone(), TEST_RATE_BPS, PLATFORM.to_string());

    // 10 concurrent attempts at 300 each against a balance of 1000:
    // exactly 3 can fit.
    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.settle_payment("buyer-5", "seller-5", 300, None).await
        }));
    }

    let mut succeeded: i64 = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 3);
    let balance = wallet_balance(&pool, "buyer-5").await;
    assert!(balance >= 0);
    assert_eq!(balance, 1000 - 300 * succeeded);
    // 3 rows per successful settlement.
    assert_eq!(ledger_count(&pool).await, 9);
}
