use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, Resource};
use crate::policy::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// Stored lowercased.
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub verification_token: Option<String>,
    #[serde(default)]
    pub membership_id: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A self-registered account: `pending`, unverified, holding a fresh
    /// verification token.
    pub fn new_pending(name: String, email: &str, password_hash: String, phone: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name,
            email: email.trim().to_lowercase(),
            password_hash,
            phone,
            role: Role::Pending,
            email_verified: false,
            verification_token: Some(uuid::Uuid::new_v4().simple().to_string()),
            membership_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Resource for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
