//! Payment gateway seam.
//!
//! The portal only ever talks to a gateway through [`PaymentGateway`]:
//! initialize a checkout, verify a reference, charge a saved authorization,
//! and authenticate webhook deliveries.

pub mod paystack;

pub use paystack::PaystackClient;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use service_core::error::AppError;
use sha2::Sha512;
use std::collections::HashMap;
use std::sync::Mutex;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub email: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub email: String,
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    pub authorization_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Success,
    Failed,
    /// Not settled yet (abandoned, ongoing, queued).
    Pending,
}

impl GatewayStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "success" => GatewayStatus::Success,
            "failed" | "reversed" => GatewayStatus::Failed,
            _ => GatewayStatus::Pending,
        }
    }
}

/// The gateway's view of one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub reference: String,
    pub status: GatewayStatus,
    pub amount: i64,
    /// Reusable card authorization, when the gateway issued one.
    pub authorization_code: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, request: &CheckoutRequest) -> Result<Checkout, AppError>;

    async fn verify(&self, reference: &str) -> Result<Transaction, AppError>;

    async fn charge_authorization(&self, request: &ChargeRequest) -> Result<Transaction, AppError>;

    /// Checks the signature header of a webhook delivery against its raw body.
    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool;
}

type HmacSha512 = Hmac<Sha512>;

/// Hex-encoded HMAC-SHA512 of `body` keyed with `secret`.
pub fn compute_signature(secret: &[u8], body: &[u8]) -> Result<String, AppError> {
    let mut mac = HmacSha512::new_from_slice(secret)
        .map_err(|_| AppError::ConfigError(anyhow::anyhow!("Invalid HMAC key length")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of a presented signature with the expected one.
pub fn signature_matches(secret: &[u8], body: &[u8], presented: &str) -> bool {
    match compute_signature(secret, body) {
        Ok(expected) => {
            let presented = presented.trim().to_ascii_lowercase();
            expected.as_bytes().ct_eq(presented.as_bytes()).into()
        }
        Err(_) => false,
    }
}

/// In-process gateway: every checkout settles with the configured outcome.
pub struct MockPaymentGateway {
    secret: String,
    outcomes: Mutex<HashMap<String, GatewayStatus>>,
    amounts: Mutex<HashMap<String, i64>>,
    charges: Mutex<Vec<ChargeRequest>>,
    charge_status: GatewayStatus,
}

impl MockPaymentGateway {
    pub const AUTHORIZATION_CODE: &'static str = "AUTH_mock";

    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            outcomes: Mutex::new(HashMap::new()),
            amounts: Mutex::new(HashMap::new()),
            charges: Mutex::new(Vec::new()),
            charge_status: GatewayStatus::Success,
        }
    }

    /// Every `charge_authorization` call reports a failed charge.
    pub fn declining_charges(mut self) -> Self {
        self.charge_status = GatewayStatus::Failed;
        self
    }

    /// Every `charge_authorization` call is left pending at the gateway.
    pub fn deferring_charges(mut self) -> Self {
        self.charge_status = GatewayStatus::Pending;
        self
    }

    /// Overrides the status `verify` reports for `reference`.
    pub fn set_outcome(&self, reference: &str, status: GatewayStatus) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.insert(reference.to_string(), status);
        }
    }

    pub fn charges(&self) -> Vec<ChargeRequest> {
        self.charges
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn sign(&self, body: &[u8]) -> Result<String, AppError> {
        compute_signature(self.secret.as_bytes(), body)
    }

    fn poisoned() -> AppError {
        AppError::InternalError(anyhow::anyhow!("mock gateway lock poisoned"))
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn initialize(&self, request: &CheckoutRequest) -> Result<Checkout, AppError> {
        self.amounts
            .lock()
            .map_err(|_| Self::poisoned())?
            .insert(request.reference.clone(), request.amount);
        Ok(Checkout {
            authorization_url: format!("https://checkout.mock/{}", request.reference),
            access_code: format!("access_{}", request.reference),
            reference: request.reference.clone(),
        })
    }

    async fn verify(&self, reference: &str) -> Result<Transaction, AppError> {
        let amount = self
            .amounts
            .lock()
            .map_err(|_| Self::poisoned())?
            .get(reference)
            .copied()
            .ok_or_else(|| {
                AppError::UpstreamError(anyhow::anyhow!("Unknown reference {}", reference))
            })?;
        let status = self
            .outcomes
            .lock()
            .map_err(|_| Self::poisoned())?
            .get(reference)
            .copied()
            .unwrap_or(GatewayStatus::Success);

        Ok(Transaction {
            reference: reference.to_string(),
            status,
            amount,
            authorization_code: (status == GatewayStatus::Success)
                .then(|| Self::AUTHORIZATION_CODE.to_string()),
        })
    }

    async fn charge_authorization(&self, request: &ChargeRequest) -> Result<Transaction, AppError> {
        self.charges
            .lock()
            .map_err(|_| Self::poisoned())?
            .push(request.clone());
        Ok(Transaction {
            reference: request.reference.clone(),
            status: self.charge_status,
            amount: request.amount,
            authorization_code: Some(request.authorization_code.clone()),
        })
    }

    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        signature_matches(self.secret.as_bytes(), body, signature)
    }
}
