use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{Config, Error as FailsafeError, StateMachine, backoff, failure_policy};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Gateway denied the request (status {status}): {body}")]
    Denied { status: u16, body: String },
    #[error("Invalid response from gateway: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitOpen(String),
}

/// Connection and credential set for the Daraja API.
#[derive(Debug, Clone)]
pub struct DarajaSettings {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub shortcode: String,
    pub passkey: String,
    pub callback_url: String,
}

impl DarajaSettings {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            base_url: config.daraja_base_url.clone(),
            consumer_key: config.daraja_consumer_key.clone(),
            consumer_secret: config.daraja_consumer_secret.clone(),
            shortcode: config.daraja_shortcode.clone(),
            passkey: config.daraja_passkey.clone(),
            callback_url: config.callback_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Response to an STK push initiation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    #[serde(rename = "ResponseDescription")]
    pub response_description: String,
    #[serde(rename = "CustomerMessage")]
    pub customer_message: String,
}

/// HTTP client for the Daraja mobile-money gateway.
#[derive(Clone)]
pub struct DarajaClient {
    client: Client,
    settings: DarajaSettings,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl DarajaClient {
    pub fn new(settings: DarajaSettings) -> Self {
        Self::with_circuit_breaker(settings, 3, 60)
    }

    /// Creates a client with custom circuit breaker configuration.
    pub fn with_circuit_breaker(
        settings: DarajaSettings,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        DarajaClient {
            client,
            settings,
            circuit_breaker,
        }
    }

    /// Returns the current state of the circuit breaker.
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    /// Fetches an OAuth access token using Basic auth over the consumer
    /// key and secret.
    pub async fn access_token(&self) -> Result<String, GatewayError> {
        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.settings.base_url.trim_end_matches('/')
        );
        let auth = BASE64.encode(format!(
            "{}:{}",
            self.settings.consumer_key, self.settings.consumer_secret
        ));
        let client = self.client.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .get(&url)
                    .header("Authorization", format!("Basic {}", auth))
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(GatewayError::Denied {
                        status: status.as_u16(),
                        body: response.text().await.unwrap_or_default(),
                    });
                }

                let token: TokenResponse = response
                    .json()
                    .await
                    .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
                Ok(token.access_token)
            })
            .await;

        match result {
            Ok(token) => Ok(token),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitOpen(
                "Daraja circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }

    /// Initiates an STK push prompt on the customer's phone. Does not
    /// imply settlement; the outcome arrives on the callback URL.
    pub async fn stk_push(
        &self,
        phone_number: &str,
        amount: i64,
        account_reference: &str,
        description: &str,
    ) -> Result<StkPushResponse, GatewayError> {
        let token = self.access_token().await?;

        let timestamp = daraja_timestamp(Utc::now());
        let password = stk_password(&self.settings.shortcode, &self.settings.passkey, &timestamp);

        let payload = json!({
            "BusinessShortCode": self.settings.shortcode,
            "Password": password,
            "Timestamp": timestamp,
            "TransactionType": "CustomerPayBillOnline",
            "Amount": amount,
            "PartyA": phone_number,
            "PartyB": self.settings.shortcode,
            "PhoneNumber": phone_number,
            "CallBackURL": self.settings.callback_url,
            "AccountReference": account_reference,
            "TransactionDesc": description,
        });

        let url = format!(
            "{}/mpesa/stkpush/v1/processrequest",
            self.settings.base_url.trim_end_matches('/')
        );
        let client = self.client.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", token))
                    .json(&payload)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(GatewayError::Denied {
                        status: status.as_u16(),
                        body: response.text().await.unwrap_or_default(),
                    });
                }

                let push: StkPushResponse = response
                    .json()
                    .await
                    .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
                Ok(push)
            })
            .await;

        match result {
            Ok(push) => Ok(push),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitOpen(
                "Daraja circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

/// Daraja expects timestamps as YYYYMMDDHHMMSS.
fn daraja_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    BASE64.encode(format!("{shortcode}{passkey}{timestamp}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_settings() -> DarajaSettings {
        DarajaSettings {
            base_url: "https://sandbox.safaricom.co.ke".to_string(),
            consumer_key: "key".to_string(),
            consumer_secret: "secret".to_string(),
            shortcode: "174379".to_string(),
            passkey: "passkey".to_string(),
            callback_url: "https://example.com/callback".to_string(),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = DarajaClient::new(test_settings());
        assert_eq!(client.settings.shortcode, "174379");
    }

    #[test]
    fn test_circuit_breaker_starts_closed() {
        let client = DarajaClient::with_circuit_breaker(test_settings(), 5, 30);
        assert_eq!(client.circuit_state(), "closed");
    }

    #[test]
    fn test_daraja_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(daraja_timestamp(at), "20250307090501");
    }

    #[test]
    fn test_stk_password_is_base64_of_concatenation() {
        let password = stk_password("174379", "pk", "20250307090501");
        assert_eq!(password, BASE64.encode("174379pk20250307090501"));
    }
}
