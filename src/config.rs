use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

/// Default commission rate: 10%, expressed in basis points.
pub const DEFAULT_COMMISSION_RATE_BPS: u32 = 1000;

/// Default owner id of the distinguished platform wallet.
pub const DEFAULT_PLATFORM_OWNER_ID: &str = "platform";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub daraja_base_url: String,
    pub daraja_consumer_key: String,
    pub daraja_consumer_secret: String,
    pub daraja_shortcode: String,
    pub daraja_passkey: String,
    pub callback_url: String,
    /// Shared secret for HMAC verification of callback bodies.
    /// Unset means verification is skipped (sandbox mode).
    pub callback_secret: Option<String>,
    pub commission_rate_bps: u32,
    pub platform_owner_id: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            daraja_base_url: env::var("DARAJA_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox.safaricom.co.ke".to_string()),
            daraja_consumer_key: env::var("DARAJA_CONSUMER_KEY")?,
            daraja_consumer_secret: env::var("DARAJA_CONSUMER_SECRET")?,
            daraja_shortcode: env::var("DARAJA_SHORTCODE")
                .unwrap_or_else(|_| "174379".to_string()),
            daraja_passkey: env::var("DARAJA_PASSKEY")?,
            callback_url: env::var("CALLBACK_URL")?,
            callback_secret: env::var("CALLBACK_SECRET").ok(),
            commission_rate_bps: parse_rate_bps(
                &env::var("COMMISSION_RATE_BPS")
                    .unwrap_or_else(|_| DEFAULT_COMMISSION_RATE_BPS.to_string()),
            )?,
            platform_owner_id: env::var("PLATFORM_OWNER_ID")
                .unwrap_or_else(|_| DEFAULT_PLATFORM_OWNER_ID.to_string()),
        })
    }
}

fn parse_rate_bps(raw: &str) -> anyhow::Result<u32> {
    let bps: u32 = raw.trim().parse()?;
    if bps > 10_000 {
        anyhow::bail!("COMMISSION_RATE_BPS must be at most 10000 (100%)");
    }
    Ok(bps)
}
