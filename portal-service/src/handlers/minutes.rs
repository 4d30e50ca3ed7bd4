use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use crate::dtos::content::{CreateMinuteRequest, MinuteResponse, UpdateMinuteRequest};
use crate::dtos::{PageParams, Paginated};
use crate::models::content::dedup_tags;
use crate::models::{new_id, Minute};
use crate::policy::Principal;
use crate::services::content::{get_visible, list_visible};
use crate::services::PageRequest;
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn list_minutes(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<MinuteResponse>>, AppError> {
    let page = PageRequest::from(params);
    let result = list_visible(state.repos.minutes.as_ref(), &state.policy, &principal, page).await?;
    Ok(Json(Paginated::from_page(result, page)))
}

pub async fn get_minute(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<MinuteResponse>, AppError> {
    let minute =
        get_visible(state.repos.minutes.as_ref(), &state.policy, &principal, &id, "Minute").await?;
    Ok(Json(minute.into()))
}

pub async fn create_minute(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateMinuteRequest>,
) -> Result<(StatusCode, Json<MinuteResponse>), AppError> {
    if let Some(meeting_id) = &payload.meeting_id {
        if state.repos.meetings.get(meeting_id).await?.is_none() {
            return Err(AppError::BadRequest(
                "meetingId: no meeting with this id".to_string(),
            ));
        }
    }

    let now = Utc::now();
    let minute = Minute {
        id: new_id(),
        title: payload.title.trim().to_string(),
        meeting_id: payload.meeting_id,
        date: payload.date,
        content: payload.content,
        file_url: payload.file_url,
        meant_for: dedup_tags(payload.meant_for),
        created_at: now,
        updated_at: now,
    };

    state.repos.minutes.insert(&minute).await?;
    tracing::info!(minute_id = %minute.id, "Minutes recorded");

    Ok((StatusCode::CREATED, Json(minute.into())))
}

pub async fn update_minute(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateMinuteRequest>,
) -> Result<Json<MinuteResponse>, AppError> {
    let mut minute = state
        .repos
        .minutes
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Minute not found".to_string()))?;

    if let Some(title) = payload.title {
        minute.title = title.trim().to_string();
    }
    if let Some(meeting_id) = payload.meeting_id {
        minute.meeting_id = Some(meeting_id);
    }
    if let Some(date) = payload.date {
        minute.date = date;
    }
    if let Some(content) = payload.content {
        minute.content = content;
    }
    if let Some(file_url) = payload.file_url {
        minute.file_url = Some(file_url);
    }
    if let Some(meant_for) = payload.meant_for {
        minute.meant_for = dedup_tags(meant_for);
    }
    minute.updated_at = Utc::now();

    if !state.repos.minutes.replace(&minute).await? {
        return Err(AppError::NotFound("Minute not found".to_string()));
    }
    Ok(Json(minute.into()))
}

pub async fn delete_minute(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.repos.minutes.delete(&id).await? {
        return Err(AppError::NotFound("Minute not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
