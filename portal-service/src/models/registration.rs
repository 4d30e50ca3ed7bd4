use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContributionType {
    Monetary,
    InKind,
    Both,
}

impl ContributionType {
    pub fn requires_amount(&self) -> bool {
        matches!(self, ContributionType::Monetary | ContributionType::Both)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    #[serde(rename = "type")]
    pub kind: ContributionType,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    #[default]
    Pending,
    Verified,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Verified => "verified",
        }
    }
}

/// A submission to attend (and optionally contribute to) an event.
///
/// Not owned by any principal once created; only administrators read or
/// change it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub event_id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub contribution: Option<Contribution>,
    #[serde(default)]
    pub status: RegistrationStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Resource for Registration {
    const COLLECTION: &'static str = "registrations";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
