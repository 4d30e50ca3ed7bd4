//! Visibility-tagged content: events, meetings, minutes and documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Resource, Tagged};
use crate::policy::Audience;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    #[default]
    General,
    Convention,
}

impl EventCategory {
    /// The category a write ends up with: the explicit one, otherwise
    /// `Convention` whenever a convention type was given.
    pub fn implied(explicit: Option<EventCategory>, convention_type: Option<ConventionType>) -> Self {
        match (explicit, convention_type) {
            (Some(category), _) => category,
            (None, Some(_)) => EventCategory::Convention,
            (None, None) => EventCategory::General,
        }
    }
}

/// How a convention's recordings are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConventionType {
    Single,
    Multiple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub venue: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date_from: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date_to: DateTime<Utc>,
    pub meant_for: Vec<Audience>,
    #[serde(default)]
    pub category: EventCategory,
    #[serde(default)]
    pub convention_type: Option<ConventionType>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub agenda: String,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub meant_for: Vec<Audience>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Minute {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub meeting_id: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub content: String,
    #[serde(default)]
    pub file_url: Option<String>,
    pub meant_for: Vec<Audience>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub file_url: String,
    pub meant_for: Vec<Audience>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Removes duplicate tags while keeping first-seen order.
pub fn dedup_tags(tags: Vec<Audience>) -> Vec<Audience> {
    let mut out = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

macro_rules! tagged_resource {
    ($ty:ty, $collection:literal) => {
        impl Resource for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> &str {
                &self.id
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
        }

        impl Tagged for $ty {
            fn meant_for(&self) -> &[Audience] {
                &self.meant_for
            }
        }
    };
}

tagged_resource!(Event, "events");
tagged_resource!(Meeting, "meetings");
tagged_resource!(Minute, "minutes");
tagged_resource!(Document, "documents");
