use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::Deserialize;
use thiserror::Error;

use super::retry::{send_with_retry, RetryConfig, RetryOutcome};

/// A hosted payment page created by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionStatus {
    pub id: String,
    pub payment_status: String,
}

impl SessionStatus {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("payment provider unreachable after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected payment provider response: {0}")]
    Decode(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),
}

/// The two provider calls checkout needs.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// The session must stop accepting payment at `expires_at`.
    async fn create_session(
        &self,
        amount_minor: i64,
        description: &str,
        success_url: &str,
        cancel_url: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PaymentSession, PaymentError>;

    async fn get_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError>;
}

/// Amount in cents, truncated toward zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64, PaymentError> {
    if amount.is_sign_negative() {
        return Err(PaymentError::InvalidAmount(amount));
    }
    (amount * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .ok_or(PaymentError::InvalidAmount(amount))
}

/// Stripe Checkout client. Built once at startup and shared through app state.
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: String,
    retry: RetryConfig,
}

#[derive(Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn read_success<T: for<'de> Deserialize<'de>>(
        outcome: RetryOutcome,
    ) -> Result<T, PaymentError> {
        match outcome {
            RetryOutcome::Success(response) => response
                .json::<T>()
                .await
                .map_err(|e| PaymentError::Decode(e.to_string())),
            RetryOutcome::HttpError(response) => {
                let status = response.status().as_u16();
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<StripeErrorBody>(&text)
                    .ok()
                    .and_then(|b| b.error.message)
                    .unwrap_or(text);
                tracing::warn!("Stripe error {}: {}", status, message);
                Err(PaymentError::Provider { status, message })
            }
            RetryOutcome::ConnectionError { attempts, source } => {
                tracing::warn!("Stripe unreachable after {} attempt(s): {}", attempts, source);
                Err(PaymentError::Transport { attempts, source })
            }
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_session(
        &self,
        amount_minor: i64,
        description: &str,
        success_url: &str,
        cancel_url: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PaymentSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        let form = [
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", "eur".to_string()),
            ("line_items[0][price_data][unit_amount]", amount_minor.to_string()),
            ("line_items[0][price_data][product_data][name]", description.to_string()),
            ("success_url", success_url.to_string()),
            ("cancel_url", cancel_url.to_string()),
            ("expires_at", expires_at.timestamp().to_string()),
        ];

        let outcome = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .bearer_auth(&self.secret_key)
                    .form(&form)
            },
            &self.retry,
        )
        .await;

        let session: StripeSession = Self::read_success(outcome).await?;
        let url = session
            .url
            .ok_or_else(|| PaymentError::Decode("checkout session has no url".into()))?;
        Ok(PaymentSession { id: session.id, url })
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError> {
        let url = format!("{}/v1/checkout/sessions/{}", self.api_base, session_id);
        let outcome = send_with_retry(
            || self.client.get(&url).bearer_auth(&self.secret_key),
            &self.retry,
        )
        .await;
        Self::read_success(outcome).await
    }
}
