//! Paystack client.
//!
//! Uses the Transactions API: initialize a checkout, verify by reference and
//! charge a saved authorization for recurring donations. Webhooks are signed
//! with `HMAC-SHA512(body, secret_key)` in the `x-paystack-signature` header.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::time::Duration;

use super::{
    signature_matches, ChargeRequest, Checkout, CheckoutRequest, GatewayStatus, PaymentGateway,
    Transaction,
};
use crate::config::PaystackConfig;

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

#[derive(Clone)]
pub struct PaystackClient {
    client: Client,
    config: PaystackConfig,
}

/// Every Paystack response wraps its payload in this envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    amount: i64,
    currency: &'a str,
    reference: &'a str,
    callback_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Serialize)]
struct ChargeBody<'a> {
    email: &'a str,
    amount: i64,
    currency: &'a str,
    reference: &'a str,
    authorization_code: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TransactionData {
    pub reference: String,
    pub status: String,
    pub amount: i64,
    #[serde(default)]
    pub authorization: Option<AuthorizationData>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorizationData {
    pub authorization_code: Option<String>,
    #[serde(default)]
    pub reusable: bool,
}

impl From<TransactionData> for Transaction {
    fn from(data: TransactionData) -> Self {
        Transaction {
            status: GatewayStatus::parse(&data.status),
            authorization_code: data
                .authorization
                .filter(|a| a.reusable)
                .and_then(|a| a.authorization_code),
            reference: data.reference,
            amount: data.amount,
        }
    }
}

/// A webhook delivery.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: TransactionData,
}

impl PaystackClient {
    pub fn new(config: PaystackConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<T, AppError> {
        if !self.is_configured() {
            return Err(AppError::UpstreamError(anyhow::anyhow!(
                "Paystack credentials not configured"
            )));
        }

        let response = request
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| AppError::UpstreamError(anyhow::anyhow!("Paystack {}: {}", operation, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::UpstreamError(anyhow::anyhow!("Paystack {}: {}", operation, e)))?;

        tracing::debug!(status = %status, operation = operation, "Paystack response");

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            AppError::UpstreamError(anyhow::anyhow!(
                "Paystack {} returned unreadable body ({}): {}",
                operation,
                status,
                e
            ))
        })?;

        match envelope.data {
            Some(data) if status.is_success() && envelope.status => Ok(data),
            _ => {
                tracing::error!(
                    status = %status,
                    message = %envelope.message,
                    operation = operation,
                    "Paystack request failed"
                );
                Err(AppError::UpstreamError(anyhow::anyhow!(
                    "Paystack {} failed: {}",
                    operation,
                    envelope.message
                )))
            }
        }
    }

    pub fn parse_webhook(body: &[u8]) -> Result<WebhookEvent, AppError> {
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(&self, request: &CheckoutRequest) -> Result<Checkout, AppError> {
        let body = InitializeBody {
            email: &request.email,
            amount: request.amount,
            currency: &request.currency,
            reference: &request.reference,
            callback_url: &request.callback_url,
        };
        let data: InitializeData = self
            .send(
                self.client.post(self.url("/transaction/initialize")).json(&body),
                "initialize",
            )
            .await?;

        tracing::info!(reference = %data.reference, amount = request.amount, "Paystack checkout initialized");

        Ok(Checkout {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<Transaction, AppError> {
        let data: TransactionData = self
            .send(
                self.client
                    .get(self.url(&format!("/transaction/verify/{}", reference))),
                "verify",
            )
            .await?;
        Ok(data.into())
    }

    async fn charge_authorization(&self, request: &ChargeRequest) -> Result<Transaction, AppError> {
        let body = ChargeBody {
            email: &request.email,
            amount: request.amount,
            currency: &request.currency,
            reference: &request.reference,
            authorization_code: &request.authorization_code,
        };
        let data: TransactionData = self
            .send(
                self.client
                    .post(self.url("/transaction/charge_authorization"))
                    .json(&body),
                "charge_authorization",
            )
            .await?;
        Ok(data.into())
    }

    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        let secret = self.config.secret_key.expose_secret();
        !secret.is_empty() && signature_matches(secret.as_bytes(), body, signature)
    }
}
