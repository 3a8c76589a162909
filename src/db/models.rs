use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A balance-holding account. Balances are integers in the smallest
/// currency unit and never go negative (enforced both in the settlement
/// engine and by a CHECK constraint).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub owner_id: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(owner_id: String, balance: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            balance,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "debit",
            Direction::Credit => "credit",
        }
    }
}

/// One append-only row per funds movement. Never updated or deleted.
#[derive(Debug, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: i64,
    pub direction: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

pub mod intent_status {
    pub const PENDING: &str = "pending";
    pub const SUCCEEDED: &str = "succeeded";
    pub const FAILED: &str = "failed";
}

/// A push-payment prompt sent to a customer's phone, resolved
/// asynchronously by the gateway callback.
#[derive(Debug, FromRow, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: Uuid,
    pub owner_id: String,
    pub phone_number: String,
    pub amount: i64,
    pub status: String,
    pub merchant_request_id: Option<String>,
    pub checkout_request_id: Option<String>,
    pub result_code: Option<i64>,
    pub result_desc: Option<String>,
    pub mpesa_receipt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentIntent {
    pub fn new(
        owner_id: String,
        phone_number: String,
        amount: i64,
        merchant_request_id: Option<String>,
        checkout_request_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            phone_number,
            amount,
            status: intent_status::PENDING.to_string(),
            merchant_request_id,
            checkout_request_id,
            result_code: None,
            result_desc: None,
            mpesa_receipt: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
