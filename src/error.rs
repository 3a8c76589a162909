use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Amount must be a positive integer in the smallest currency unit")]
    InvalidAmount,

    #[error("{which} wallet not found")]
    WalletNotFound { which: String },

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Platform wallet is not provisioned")]
    PlatformWalletMissing,

    #[error("Store unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidAmount => StatusCode::BAD_REQUEST,
            AppError::WalletNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InsufficientFunds => StatusCode::CONFLICT,
            AppError::PlatformWalletMissing => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Machine-readable error kind surfaced to API clients.
    fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidAmount => "invalid_amount",
            AppError::WalletNotFound { .. } => "wallet_not_found",
            AppError::InsufficientFunds => "insufficient_funds",
            AppError::PlatformWalletMissing => "platform_wallet_missing",
            AppError::Database(_) => "store_unavailable",
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Gateway(_) => "gateway",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
