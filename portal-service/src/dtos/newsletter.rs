use serde::{Deserialize, Serialize};
use validator::Validate;

use super::rfc3339;
use crate::models::Subscriber;
use crate::utils::Rules;

#[derive(Debug, Deserialize, Validate)]
pub struct SubscribeRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(max = 100, message = "is too long"))]
    pub name: Option<String>,
}

impl Rules for SubscribeRequest {}

#[derive(Debug, Deserialize, Validate)]
pub struct UnsubscribeRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

impl Rules for UnsubscribeRequest {}

#[derive(Debug, Deserialize)]
pub struct SubscriberListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub active: bool,
    pub created_at: String,
}

impl From<Subscriber> for SubscriberResponse {
    fn from(s: Subscriber) -> Self {
        Self {
            id: s.id,
            email: s.email,
            name: s.name,
            active: s.active,
            created_at: rfc3339(s.created_at),
        }
    }
}
