use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use crate::dtos::newsletter::{
    SubscribeRequest, SubscriberListParams, SubscriberResponse, UnsubscribeRequest,
};
use crate::dtos::{MessageResponse, Paginated};
use crate::models::Subscriber;
use crate::services::{ListFilter, PageRequest};
use crate::utils::ValidatedJson;
use crate::AppState;

/// Subscribing an address twice is not an error. An address that had
/// unsubscribed is reactivated.
pub async fn subscribe(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscriberResponse>), AppError> {
    let email = payload.email.trim().to_lowercase();
    let filter = ListFilter::new().eq("email", email.as_str());

    if let Some(mut existing) = state.repos.subscribers.find_one(&filter).await? {
        if !existing.active {
            existing.active = true;
            if payload.name.is_some() {
                existing.name = payload.name;
            }
            existing.updated_at = Utc::now();
            state.repos.subscribers.replace(&existing).await?;
            tracing::info!(subscriber_id = %existing.id, "Subscriber reactivated");
        }
        return Ok((StatusCode::OK, Json(existing.into())));
    }

    let subscriber = Subscriber::new(&email, payload.name);
    state.repos.subscribers.insert(&subscriber).await?;
    metrics::counter!("newsletter_subscriptions_total").increment(1);

    Ok((StatusCode::CREATED, Json(subscriber.into())))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UnsubscribeRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = payload.email.trim().to_lowercase();
    let mut subscriber = state
        .repos
        .subscribers
        .find_one(&ListFilter::new().eq("email", email.as_str()))
        .await?
        .ok_or_else(|| AppError::NotFound("Subscriber not found".to_string()))?;

    if subscriber.active {
        subscriber.active = false;
        subscriber.updated_at = Utc::now();
        state.repos.subscribers.replace(&subscriber).await?;
    }

    Ok(Json(MessageResponse::new("Unsubscribed")))
}

pub async fn list_subscribers(
    State(state): State<AppState>,
    Query(params): Query<SubscriberListParams>,
) -> Result<Json<Paginated<SubscriberResponse>>, AppError> {
    let page = PageRequest::new(params.page, params.limit);
    let filter = ListFilter::new().eq_opt("active", params.active);
    let result = state.repos.subscribers.list(&filter, page).await?;
    Ok(Json(Paginated::from_page(result, page)))
}
