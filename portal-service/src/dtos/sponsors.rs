use serde::{Deserialize, Serialize};
use validator::Validate;

use super::rfc3339;
use crate::models::Sponsor;
use crate::utils::Rules;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSponsorRequest {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    #[validate(url(message = "must be a valid URL"))]
    pub logo_url: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub website: Option<String>,
    pub tier: Option<String>,
    pub active: Option<bool>,
}

impl Rules for CreateSponsorRequest {}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSponsorRequest {
    #[validate(length(min = 1, max = 200, message = "name cannot be empty"))]
    pub name: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub logo_url: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub website: Option<String>,
    pub tier: Option<String>,
    pub active: Option<bool>,
}

impl Rules for UpdateSponsorRequest {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorResponse {
    pub id: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub website: Option<String>,
    pub tier: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Sponsor> for SponsorResponse {
    fn from(sponsor: Sponsor) -> Self {
        Self {
            id: sponsor.id,
            name: sponsor.name,
            logo_url: sponsor.logo_url,
            website: sponsor.website,
            tier: sponsor.tier,
            active: sponsor.active,
            created_at: rfc3339(sponsor.created_at),
            updated_at: rfc3339(sponsor.updated_at),
        }
    }
}
