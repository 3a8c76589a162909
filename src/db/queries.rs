use crate::db::models::{Direction, LedgerEntry, PaymentIntent, Wallet};
use chrono::Utc;
use sqlx::{PgPool, Postgres, Result, Transaction as SqlxTransaction};
use uuid::Uuid;

// --- Wallet queries ---

pub async fn insert_wallet(pool: &PgPool, wallet: &Wallet) -> Result<Wallet> {
    sqlx::query_as::<_, Wallet>(
        r#"
        INSERT INTO wallets (id, owner_id, balance, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(wallet.id)
    .bind(&wallet.owner_id)
    .bind(wallet.balance)
    .bind(wallet.created_at)
    .bind(wallet.updated_at)
    .fetch_one(pool)
    .await
}

pub async fn get_wallet(pool: &PgPool, owner_id: &str) -> Result<Option<Wallet>> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_wallets(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Wallet>> {
    sqlx::query_as::<_, Wallet>(
        "SELECT * FROM wallets ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Row-lock a wallet for the duration of the enclosing transaction.
/// Callers must acquire locks in ascending owner_id order.
pub async fn lock_wallet(
    executor: &mut SqlxTransaction<'_, Postgres>,
    owner_id: &str,
) -> Result<Option<Wallet>> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE owner_id = $1 FOR UPDATE")
        .bind(owner_id)
        .fetch_optional(&mut **executor)
        .await
}

/// Provision a zero-balance wallet if the owner has none yet.
pub async fn ensure_wallet(
    executor: &mut SqlxTransaction<'_, Postgres>,
    owner_id: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wallets (id, owner_id, balance, created_at, updated_at)
        VALUES ($1, $2, 0, NOW(), NOW())
        ON CONFLICT (owner_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .execute(&mut **executor)
    .await?;

    Ok(())
}

pub async fn adjust_balance(
    executor: &mut SqlxTransaction<'_, Postgres>,
    wallet_id: Uuid,
    delta: i64,
) -> Result<()> {
    sqlx::query("UPDATE wallets SET balance = balance + $1, updated_at = NOW() WHERE id = $2")
        .bind(delta)
        .bind(wallet_id)
        .execute(&mut **executor)
        .await?;

    Ok(())
}

// --- Ledger queries ---

pub async fn insert_entry(
    executor: &mut SqlxTransaction<'_, Postgres>,
    wallet_id: Uuid,
    amount: i64,
    direction: Direction,
    description: &str,
) -> Result<LedgerEntry> {
    sqlx::query_as::<_, LedgerEntry>(
        r#"
        INSERT INTO transactions (id, wallet_id, amount, direction, description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(wallet_id)
    .bind(amount)
    .bind(direction.as_str())
    .bind(description)
    .bind(Utc::now())
    .fetch_one(&mut **executor)
    .await
}

pub async fn list_entries(
    pool: &PgPool,
    wallet_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<LedgerEntry>> {
    sqlx::query_as::<_, LedgerEntry>(
        r#"
        SELECT * FROM transactions
        WHERE wallet_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(wallet_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

// --- Payment intent queries ---

pub async fn insert_intent(pool: &PgPool, intent: &PaymentIntent) -> Result<PaymentIntent> {
    sqlx::query_as::<_, PaymentIntent>(
        r#"
        INSERT INTO payment_intents (
            id, owner_id, phone_number, amount, status,
            merchant_request_id, checkout_request_id, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(intent.id)
    .bind(&intent.owner_id)
    .bind(&intent.phone_number)
    .bind(intent.amount)
    .bind(&intent.status)
    .bind(&intent.merchant_request_id)
    .bind(&intent.checkout_request_id)
    .bind(intent.created_at)
    .bind(intent.updated_at)
    .fetch_one(pool)
    .await
}

pub async fn get_intent(pool: &PgPool, id: Uuid) -> Result<Option<PaymentIntent>> {
    sqlx::query_as::<_, PaymentIntent>("SELECT * FROM payment_intents WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_intent_by_checkout_id(
    executor: &mut SqlxTransaction<'_, Postgres>,
    checkout_request_id: &str,
) -> Result<Option<PaymentIntent>> {
    sqlx::query_as::<_, PaymentIntent>(
        "SELECT * FROM payment_intents WHERE checkout_request_id = $1",
    )
    .bind(checkout_request_id)
    .fetch_optional(&mut **executor)
    .await
}

/// Atomically claim a pending intent for result processing. Returns None
/// when the intent was already resolved, which is how duplicate callback
/// deliveries are detected.
pub async fn claim_pending_intent(
    executor: &mut SqlxTransaction<'_, Postgres>,
    checkout_request_id: &str,
    status: &str,
    result_code: i64,
    result_desc: &str,
    mpesa_receipt: Option<&str>,
) -> Result<Option<PaymentIntent>> {
    sqlx::query_as::<_, PaymentIntent>(
        r#"
        UPDATE payment_intents
        SET status = $2, result_code = $3, result_desc = $4,
            mpesa_receipt = $5, updated_at = NOW()
        WHERE checkout_request_id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(checkout_request_id)
    .bind(status)
    .bind(result_code)
    .bind(result_desc)
    .bind(mpesa_receipt)
    .fetch_optional(&mut **executor)
    .await
}
