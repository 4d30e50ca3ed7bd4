use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::rfc3339;
use crate::models::{Contribution, ContributionType, Registration, RegistrationStatus};
use crate::utils::validation::{add_error, into_result};
use crate::utils::Rules;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContributionInput {
    #[serde(rename = "type")]
    pub kind: ContributionType,
    pub amount: Option<f64>,
    pub description: Option<String>,
}

impl From<ContributionInput> for Contribution {
    fn from(input: ContributionInput) -> Self {
        Contribution {
            kind: input.kind,
            amount: input.amount,
            description: input.description,
        }
    }
}

/// Monetary pledges must carry a positive amount.
fn check_contribution(contribution: Option<&ContributionInput>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Some(c) = contribution {
        if c.kind.requires_amount() {
            match c.amount {
                None => add_error(
                    &mut errors,
                    "contribution.amount",
                    "required",
                    "amount is required when contribution type is monetary or both",
                ),
                Some(amount) if amount.is_nan() || amount <= 0.0 => add_error(
                    &mut errors,
                    "contribution.amount",
                    "range",
                    "amount must be greater than zero",
                ),
                Some(_) => {}
            }
        }
    }
    into_result(errors)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegistrationRequest {
    pub event_id: Option<String>,
    #[validate(length(min = 1, max = 100, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(max = 32, message = "is too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 200, message = "is too long"))]
    pub organization: Option<String>,
    pub contribution: Option<ContributionInput>,
}

impl Rules for CreateRegistrationRequest {
    fn check_rules(&self) -> Result<(), ValidationErrors> {
        check_contribution(self.contribution.as_ref())
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRegistrationRequest {
    #[validate(length(min = 1, max = 100, message = "name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 32, message = "is too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 200, message = "is too long"))]
    pub organization: Option<String>,
    pub contribution: Option<ContributionInput>,
    pub status: Option<RegistrationStatus>,
}

impl Rules for UpdateRegistrationRequest {
    fn check_rules(&self) -> Result<(), ValidationErrors> {
        check_contribution(self.contribution.as_ref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub event_id: Option<String>,
    pub status: Option<RegistrationStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    pub event_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub contribution: Option<Contribution>,
    pub status: RegistrationStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Registration> for RegistrationResponse {
    fn from(r: Registration) -> Self {
        Self {
            id: r.id,
            event_id: r.event_id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            organization: r.organization,
            contribution: r.contribution,
            status: r.status,
            created_at: rfc3339(r.created_at),
            updated_at: rfc3339(r.updated_at),
        }
    }
}
