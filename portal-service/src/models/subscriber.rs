use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, Resource};

/// A newsletter recipient. Unsubscribing keeps the record and clears `active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub active: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn new(email: &str, name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            email: email.trim().to_lowercase(),
            name,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Resource for Subscriber {
    const COLLECTION: &'static str = "subscribers";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
