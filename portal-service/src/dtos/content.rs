//! Requests and responses for events, meetings, minutes and documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::rfc3339;
use crate::models::{ConventionType, Document, Event, EventCategory, Meeting, Minute};
use crate::policy::Audience;
use crate::utils::validation::{add_error, into_result};
use crate::utils::Rules;

const TAGS_REQUIRED: &str = "meantFor must list at least one audience";

/// Cross-field rules shared by event creation and event edits.
pub struct EventShape<'a> {
    pub date_from: DateTime<Utc>,
    pub date_to: DateTime<Utc>,
    pub category: EventCategory,
    pub convention_type: Option<ConventionType>,
    pub video: Option<&'a str>,
    pub videos: &'a [String],
}

impl<'a> EventShape<'a> {
    pub fn of(event: &'a Event) -> Self {
        Self {
            date_from: event.date_from,
            date_to: event.date_to,
            category: event.category,
            convention_type: event.convention_type,
            video: event.video.as_deref(),
            videos: &event.videos,
        }
    }

    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.date_from > self.date_to {
            add_error(
                &mut errors,
                "dateTo",
                "date_order",
                "dateTo must not be earlier than dateFrom",
            );
        }

        if self.category == EventCategory::General && self.convention_type.is_some() {
            add_error(
                &mut errors,
                "conventionType",
                "invalid",
                "conventionType is only allowed on convention events",
            );
        }

        if self.category == EventCategory::Convention {
            match self.convention_type {
                None => add_error(
                    &mut errors,
                    "conventionType",
                    "required",
                    "conventionType is required for convention events",
                ),
                Some(ConventionType::Single) => {
                    if self.video.map(str::trim).unwrap_or_default().is_empty() {
                        add_error(
                            &mut errors,
                            "video",
                            "required",
                            "video is required for single convention events",
                        );
                    }
                }
                Some(ConventionType::Multiple) => {
                    if self.videos.iter().all(|v| v.trim().is_empty()) {
                        add_error(
                            &mut errors,
                            "videos",
                            "required",
                            "videos must list at least one video for multiple convention events",
                        );
                    }
                }
            }
        }

        into_result(errors)
    }
}

fn require_tags(tags: Option<&Vec<Audience>>, errors: &mut ValidationErrors) {
    if let Some(tags) = tags {
        if tags.is_empty() {
            add_error(errors, "meantFor", "length", TAGS_REQUIRED);
        }
    }
}

// ---- events ----

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "venue is required"))]
    pub venue: String,
    pub date_from: DateTime<Utc>,
    pub date_to: DateTime<Utc>,
    pub meant_for: Vec<Audience>,
    pub category: Option<EventCategory>,
    #[serde(default, alias = "type")]
    pub convention_type: Option<ConventionType>,
    #[validate(url(message = "must be a valid URL"))]
    pub video: Option<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub image_url: Option<String>,
}

impl CreateEventRequest {
    pub fn category(&self) -> EventCategory {
        EventCategory::implied(self.category, self.convention_type)
    }
}

impl Rules for CreateEventRequest {
    fn check_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = match (EventShape {
            date_from: self.date_from,
            date_to: self.date_to,
            category: self.category(),
            convention_type: self.convention_type,
            video: self.video.as_deref(),
            videos: &self.videos,
        })
        .check()
        {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        require_tags(Some(&self.meant_for), &mut errors);
        into_result(errors)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200, message = "title cannot be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "venue cannot be empty"))]
    pub venue: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub meant_for: Option<Vec<Audience>>,
    pub category: Option<EventCategory>,
    #[serde(alias = "type")]
    pub convention_type: Option<ConventionType>,
    #[validate(url(message = "must be a valid URL"))]
    pub video: Option<String>,
    pub videos: Option<Vec<String>>,
    #[validate(url(message = "must be a valid URL"))]
    pub image_url: Option<String>,
}

impl Rules for UpdateEventRequest {
    fn check_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_tags(self.meant_for.as_ref(), &mut errors);
        into_result(errors)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub venue: String,
    pub date_from: String,
    pub date_to: String,
    pub meant_for: Vec<Audience>,
    pub category: EventCategory,
    pub convention_type: Option<ConventionType>,
    pub video: Option<String>,
    pub videos: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            title: event.title,
            description: event.description,
            venue: event.venue,
            date_from: rfc3339(event.date_from),
            date_to: rfc3339(event.date_to),
            meant_for: event.meant_for,
            category: event.category,
            convention_type: event.convention_type,
            video: event.video,
            videos: event.videos,
            image_url: event.image_url,
            created_at: rfc3339(event.created_at),
            updated_at: rfc3339(event.updated_at),
        }
    }
}

// ---- meetings ----

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub agenda: String,
    pub venue: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub link: Option<String>,
    pub date: DateTime<Utc>,
    pub meant_for: Vec<Audience>,
}

impl Rules for CreateMeetingRequest {
    fn check_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_tags(Some(&self.meant_for), &mut errors);
        into_result(errors)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeetingRequest {
    #[validate(length(min = 1, max = 200, message = "title cannot be empty"))]
    pub title: Option<String>,
    pub agenda: Option<String>,
    pub venue: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub link: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub meant_for: Option<Vec<Audience>>,
}

impl Rules for UpdateMeetingRequest {
    fn check_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_tags(self.meant_for.as_ref(), &mut errors);
        into_result(errors)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingResponse {
    pub id: String,
    pub title: String,
    pub agenda: String,
    pub venue: Option<String>,
    pub link: Option<String>,
    pub date: String,
    pub meant_for: Vec<Audience>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Meeting> for MeetingResponse {
    fn from(meeting: Meeting) -> Self {
        Self {
            id: meeting.id,
            title: meeting.title,
            agenda: meeting.agenda,
            venue: meeting.venue,
            link: meeting.link,
            date: rfc3339(meeting.date),
            meant_for: meeting.meant_for,
            created_at: rfc3339(meeting.created_at),
            updated_at: rfc3339(meeting.updated_at),
        }
    }
}

// ---- minutes ----

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMinuteRequest {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    pub meeting_id: Option<String>,
    pub date: DateTime<Utc>,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
    #[validate(url(message = "must be a valid URL"))]
    pub file_url: Option<String>,
    pub meant_for: Vec<Audience>,
}

impl Rules for CreateMinuteRequest {
    fn check_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_tags(Some(&self.meant_for), &mut errors);
        into_result(errors)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMinuteRequest {
    #[validate(length(min = 1, max = 200, message = "title cannot be empty"))]
    pub title: Option<String>,
    pub meeting_id: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "content cannot be empty"))]
    pub content: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub file_url: Option<String>,
    pub meant_for: Option<Vec<Audience>>,
}

impl Rules for UpdateMinuteRequest {
    fn check_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_tags(self.meant_for.as_ref(), &mut errors);
        into_result(errors)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinuteResponse {
    pub id: String,
    pub title: String,
    pub meeting_id: Option<String>,
    pub date: String,
    pub content: String,
    pub file_url: Option<String>,
    pub meant_for: Vec<Audience>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Minute> for MinuteResponse {
    fn from(minute: Minute) -> Self {
        Self {
            id: minute.id,
            title: minute.title,
            meeting_id: minute.meeting_id,
            date: rfc3339(minute.date),
            content: minute.content,
            file_url: minute.file_url,
            meant_for: minute.meant_for,
            created_at: rfc3339(minute.created_at),
            updated_at: rfc3339(minute.updated_at),
        }
    }
}

// ---- documents ----

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub file_url: String,
    pub meant_for: Vec<Audience>,
}

impl Rules for CreateDocumentRequest {
    fn check_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_tags(Some(&self.meant_for), &mut errors);
        into_result(errors)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    #[validate(length(min = 1, max = 200, message = "title cannot be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub file_url: Option<String>,
    pub meant_for: Option<Vec<Audience>>,
}

impl Rules for UpdateDocumentRequest {
    fn check_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_tags(self.meant_for.as_ref(), &mut errors);
        into_result(errors)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub meant_for: Vec<Audience>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            title: document.title,
            description: document.description,
            file_url: document.file_url,
            meant_for: document.meant_for,
            created_at: rfc3339(document.created_at),
            updated_at: rfc3339(document.updated_at),
        }
    }
}
