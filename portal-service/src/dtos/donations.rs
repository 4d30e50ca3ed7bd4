use serde::{Deserialize, Serialize};
use validator::Validate;

use super::rfc3339;
use crate::models::{BillingInterval, Payment, PaymentStatus};
use crate::utils::Rules;

#[derive(Debug, Deserialize, Validate)]
pub struct DonationRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(max = 100, message = "is too long"))]
    pub name: Option<String>,
    /// Minor currency units.
    #[validate(range(min = 100, message = "must be at least 100"))]
    pub amount: i64,
    /// Makes the donation recurring at this interval.
    pub interval: Option<BillingInterval>,
}

impl Rules for DonationRequest {}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyDonationRequest {
    #[validate(length(min = 1, message = "reference is required"))]
    pub reference: String,
}

impl Rules for VerifyDonationRequest {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationResponse {
    pub reference: String,
    pub authorization_url: String,
    pub subscription_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub reference: String,
    pub email: String,
    pub name: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub subscription_id: Option<String>,
    pub paid_at: Option<String>,
    pub created_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            reference: p.reference,
            email: p.email,
            name: p.name,
            amount: p.amount,
            currency: p.currency,
            status: p.status,
            subscription_id: p.subscription_id,
            paid_at: p.paid_at.map(|at| rfc3339(at.to_chrono())),
            created_at: rfc3339(p.created_at),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct SweepResponse {
    pub due: u64,
    pub charged: u64,
    pub pending: u64,
    pub failed: u64,
}
