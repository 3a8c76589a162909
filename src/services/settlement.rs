use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use std::collections::HashMap;

use crate::db::models::{Direction, Wallet, intent_status};
use crate::db::queries;
use crate::error::AppError;
use crate::gateway::callback::StkCallback;

pub const DEFAULT_PAYMENT_DESCRIPTION: &str = "Service payment";
const EARNINGS_DESCRIPTION: &str = "Service earnings";
const COMMISSION_DESCRIPTION: &str = "Commission earned";
const TOPUP_DESCRIPTION: &str = "Mobile money top-up";
const TOPUP_COMMISSION_DESCRIPTION: &str = "Top-up commission";

#[derive(Debug, Clone, Serialize)]
pub struct SettlementOutcome {
    pub gross_amount: i64,
    pub net_amount: i64,
    pub commission: i64,
    pub buyer_id: String,
    pub seller_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopupOutcome {
    pub gross_amount: i64,
    pub net_amount: i64,
    pub commission: i64,
    pub owner_id: String,
}

/// How an inbound gateway notification was applied.
#[derive(Debug)]
pub enum CallbackDisposition {
    Credited(TopupOutcome),
    Failed { code: i64, description: String },
    Duplicate,
    Unknown,
}

/// Split a gross amount into (net, commission) at the given rate.
/// The commission rounds half-up to the smallest currency unit; the net
/// is the remainder, so `net + commission == gross` holds structurally.
pub fn split_amount(gross_amount: i64, commission_rate_bps: u32) -> (i64, i64) {
    let commission =
        ((gross_amount as i128 * commission_rate_bps as i128 + 5_000) / 10_000) as i64;
    (gross_amount - commission, commission)
}

/// Moves funds between buyer, seller and the platform wallet as one
/// all-or-nothing unit. All monetary amounts are integers in the
/// smallest currency unit.
#[derive(Clone)]
pub struct SettlementEngine {
    pool: PgPool,
    commission_rate_bps: u32,
    platform_owner_id: String,
}

impl SettlementEngine {
    pub fn new(pool: PgPool, commission_rate_bps: u32, platform_owner_id: String) -> Self {
        Self {
            pool,
            commission_rate_bps,
            platform_owner_id,
        }
    }

    pub fn split(&self, gross_amount: i64) -> (i64, i64) {
        split_amount(gross_amount, self.commission_rate_bps)
    }

    /// Debit the buyer by the gross amount, credit the seller with the
    /// net and the platform with the commission, and append one ledger
    /// row per movement. Either all six writes commit or none do.
    pub async fn settle_payment(
        &self,
        buyer_id: &str,
        seller_id: &str,
        gross_amount: i64,
        description: Option<&str>,
    ) -> Result<SettlementOutcome, AppError> {
        if gross_amount <= 0 {
            return Err(AppError::InvalidAmount);
        }
        if buyer_id == seller_id {
            return Err(AppError::Validation(
                "buyer and seller must be different wallets".to_string(),
            ));
        }
        if buyer_id == self.platform_owner_id || seller_id == self.platform_owner_id {
            return Err(AppError::Validation(
                "the platform wallet cannot be a settlement party".to_string(),
            ));
        }

        let (net_amount, commission) = self.split(gross_amount);

        let mut tx = self.pool.begin().await?;

        // Fixed global lock order: ascending owner_id across all three
        // wallets, so concurrent settlements cannot deadlock.
        let mut order = [buyer_id, seller_id, self.platform_owner_id.as_str()];
        order.sort_unstable();

        let mut locked: HashMap<String, Wallet> = HashMap::new();
        for owner in order {
            if let Some(wallet) = queries::lock_wallet(&mut tx, owner).await? {
                locked.insert(wallet.owner_id.clone(), wallet);
            }
        }

        let buyer = locked.remove(buyer_id).ok_or(AppError::WalletNotFound {
            which: "buyer".to_string(),
        })?;
        let seller = locked.remove(seller_id).ok_or(AppError::WalletNotFound {
            which: "seller".to_string(),
        })?;
        let platform = locked
            .remove(self.platform_owner_id.as_str())
            .ok_or(AppError::PlatformWalletMissing)?;

        // Pre-checked under the row lock; the buyer debit is the only
        // movement that can reduce a balance.
        if buyer.balance < gross_amount {
            return Err(AppError::InsufficientFunds);
        }

        queries::adjust_balance(&mut tx, buyer.id, -gross_amount).await?;
        queries::insert_entry(
            &mut tx,
            buyer.id,
            gross_amount,
            Direction::Debit,
            description.unwrap_or(DEFAULT_PAYMENT_DESCRIPTION),
        )
        .await?;

        if net_amount > 0 {
            queries::adjust_balance(&mut tx, seller.id, net_amount).await?;
            queries::insert_entry(
                &mut tx,
                seller.id,
                net_amount,
                Direction::Credit,
                EARNINGS_DESCRIPTION,
            )
            .await?;
        }

        if commission > 0 {
            queries::adjust_balance(&mut tx, platform.id, commission).await?;
            queries::insert_entry(
                &mut tx,
                platform.id,
                commission,
                Direction::Credit,
                COMMISSION_DESCRIPTION,
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            buyer_id,
            seller_id,
            gross_amount,
            net_amount,
            commission,
            "settled payment"
        );

        Ok(SettlementOutcome {
            gross_amount,
            net_amount,
            commission,
            buyer_id: buyer_id.to_string(),
            seller_id: seller_id.to_string(),
        })
    }

    /// Credit-only variant used for mobile-money top-ups: the net goes to
    /// the owner, the commission to the platform. The owner wallet is
    /// provisioned on first use.
    pub async fn credit_topup(
        &self,
        owner_id: &str,
        gross_amount: i64,
    ) -> Result<TopupOutcome, AppError> {
        let mut tx = self.pool.begin().await?;
        let outcome = self.credit_in_tx(&mut tx, owner_id, gross_amount).await?;
        tx.commit().await?;

        tracing::info!(
            owner_id,
            gross_amount,
            net_amount = outcome.net_amount,
            commission = outcome.commission,
            "credited top-up"
        );

        Ok(outcome)
    }

    /// Apply an asynchronous gateway payment result exactly once. The
    /// pending intent row is claimed with a conditional update inside the
    /// same transaction as the wallet credit, so redelivered
    /// notifications are acknowledged as duplicates without moving funds.
    pub async fn apply_gateway_result(
        &self,
        callback: &StkCallback,
    ) -> Result<CallbackDisposition, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(intent) =
            queries::get_intent_by_checkout_id(&mut tx, &callback.checkout_request_id).await?
        else {
            tracing::warn!(
                checkout_request_id = %callback.checkout_request_id,
                "callback for unknown payment intent"
            );
            return Ok(CallbackDisposition::Unknown);
        };

        if intent.status != intent_status::PENDING {
            return Ok(CallbackDisposition::Duplicate);
        }

        if !callback.is_success() {
            let claimed = queries::claim_pending_intent(
                &mut tx,
                &callback.checkout_request_id,
                intent_status::FAILED,
                callback.result_code,
                &callback.result_desc,
                None,
            )
            .await?;
            if claimed.is_none() {
                return Ok(CallbackDisposition::Duplicate);
            }
            tx.commit().await?;
            tracing::info!(
                checkout_request_id = %callback.checkout_request_id,
                result_code = callback.result_code,
                "gateway payment failed"
            );
            return Ok(CallbackDisposition::Failed {
                code: callback.result_code,
                description: callback.result_desc.clone(),
            });
        }

        // The gateway's metadata amount is authoritative for the credit.
        let amount = callback.amount().ok_or_else(|| {
            AppError::BadRequest("callback metadata is missing Amount".to_string())
        })?;

        let claimed = queries::claim_pending_intent(
            &mut tx,
            &callback.checkout_request_id,
            intent_status::SUCCEEDED,
            callback.result_code,
            &callback.result_desc,
            callback.receipt().as_deref(),
        )
        .await?;
        let Some(claimed) = claimed else {
            return Ok(CallbackDisposition::Duplicate);
        };

        let outcome = self.credit_in_tx(&mut tx, &claimed.owner_id, amount).await?;
        tx.commit().await?;

        tracing::info!(
            checkout_request_id = %callback.checkout_request_id,
            owner_id = %claimed.owner_id,
            gross_amount = outcome.gross_amount,
            net_amount = outcome.net_amount,
            "applied gateway payment result"
        );

        Ok(CallbackDisposition::Credited(outcome))
    }

    async fn credit_in_tx(
        &self,
        tx: &mut SqlxTransaction<'_, Postgres>,
        owner_id: &str,
        gross_amount: i64,
    ) -> Result<TopupOutcome, AppError> {
        if gross_amount <= 0 {
            return Err(AppError::InvalidAmount);
        }
        if owner_id == self.platform_owner_id {
            return Err(AppError::Validation(
                "the platform wallet cannot receive a top-up".to_string(),
            ));
        }

        queries::ensure_wallet(tx, owner_id).await?;

        let (net_amount, commission) = self.split(gross_amount);

        let mut order = [owner_id, self.platform_owner_id.as_str()];
        order.sort_unstable();

        let mut locked: HashMap<String, Wallet> = HashMap::new();
        for owner in order {
            if let Some(wallet) = queries::lock_wallet(tx, owner).await? {
                locked.insert(wallet.owner_id.clone(), wallet);
            }
        }

        let owner = locked.remove(owner_id).ok_or(AppError::WalletNotFound {
            which: "owner".to_string(),
        })?;
        let platform = locked
            .remove(self.platform_owner_id.as_str())
            .ok_or(AppError::PlatformWalletMissing)?;

        if net_amount > 0 {
            queries::adjust_balance(tx, owner.id, net_amount).await?;
            queries::insert_entry(tx, owner.id, net_amount, Direction::Credit, TOPUP_DESCRIPTION)
                .await?;
        }

        if commission > 0 {
            queries::adjust_balance(tx, platform.id, commission).await?;
            queries::insert_entry(
                tx,
                platform.id,
                commission,
                Direction::Credit,
                TOPUP_COMMISSION_DESCRIPTION,
            )
            .await?;
        }

        Ok(TopupOutcome {
            gross_amount,
            net_amount,
            commission,
            owner_id: owner_id.to_string(),
        })
    }
}
