use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use crate::dtos::content::{CreateEventRequest, EventResponse, EventShape, UpdateEventRequest};
use crate::dtos::{PageParams, Paginated};
use crate::models::content::dedup_tags;
use crate::models::{new_id, Event, EventCategory};
use crate::policy::Principal;
use crate::services::content::{get_visible, list_visible};
use crate::services::PageRequest;
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn list_events(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<EventResponse>>, AppError> {
    let page = PageRequest::from(params);
    let result = list_visible(state.repos.events.as_ref(), &state.policy, &principal, page).await?;
    Ok(Json(Paginated::from_page(result, page)))
}

pub async fn get_event(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<EventResponse>, AppError> {
    let event = get_visible(state.repos.events.as_ref(), &state.policy, &principal, &id, "Event").await?;
    Ok(Json(event.into()))
}

pub async fn create_event(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), AppError> {
    let now = Utc::now();
    let category = payload.category();
    let event = Event {
        id: new_id(),
        title: payload.title.trim().to_string(),
        description: payload.description,
        venue: payload.venue,
        date_from: payload.date_from,
        date_to: payload.date_to,
        meant_for: dedup_tags(payload.meant_for),
        category,
        convention_type: payload.convention_type,
        video: payload.video,
        videos: payload.videos,
        image_url: payload.image_url,
        created_at: now,
        updated_at: now,
    };

    state.repos.events.insert(&event).await?;
    tracing::info!(event_id = %event.id, "Event created");

    Ok((StatusCode::CREATED, Json(event.into())))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateEventRequest>,
) -> Result<Json<EventResponse>, AppError> {
    let mut event = state
        .repos
        .events
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if let Some(title) = payload.title {
        event.title = title.trim().to_string();
    }
    if let Some(description) = payload.description {
        event.description = description;
    }
    if let Some(venue) = payload.venue {
        event.venue = venue;
    }
    if let Some(date_from) = payload.date_from {
        event.date_from = date_from;
    }
    if let Some(date_to) = payload.date_to {
        event.date_to = date_to;
    }
    if let Some(meant_for) = payload.meant_for {
        event.meant_for = dedup_tags(meant_for);
    }
    if payload.category.is_some() || payload.convention_type.is_some() {
        event.category = EventCategory::implied(payload.category, payload.convention_type);
    }
    match payload.convention_type {
        Some(convention_type) => event.convention_type = Some(convention_type),
        None if event.category == EventCategory::General => event.convention_type = None,
        None => {}
    }
    if let Some(video) = payload.video {
        event.video = Some(video);
    }
    if let Some(videos) = payload.videos {
        event.videos = videos;
    }
    if let Some(image_url) = payload.image_url {
        event.image_url = Some(image_url);
    }

    // The edit may have broken a rule that only holds across fields.
    EventShape::of(&event).check()?;

    event.updated_at = Utc::now();
    if !state.repos.events.replace(&event).await? {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    Ok(Json(event.into()))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.repos.events.delete(&id).await? {
        return Err(AppError::NotFound("Event not found".to_string()));
    }
    tracing::info!(event_id = %id, "Event deleted");
    Ok(StatusCode::NO_CONTENT)
}
