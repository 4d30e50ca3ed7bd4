use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use crate::dtos::content::{CreateMeetingRequest, MeetingResponse, UpdateMeetingRequest};
use crate::dtos::{PageParams, Paginated};
use crate::models::content::dedup_tags;
use crate::models::{new_id, Meeting};
use crate::policy::Principal;
use crate::services::content::{get_visible, list_visible};
use crate::services::PageRequest;
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn list_meetings(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<MeetingResponse>>, AppError> {
    let page = PageRequest::from(params);
    let result = list_visible(state.repos.meetings.as_ref(), &state.policy, &principal, page).await?;
    Ok(Json(Paginated::from_page(result, page)))
}

pub async fn get_meeting(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<MeetingResponse>, AppError> {
    let meeting =
        get_visible(state.repos.meetings.as_ref(), &state.policy, &principal, &id, "Meeting").await?;
    Ok(Json(meeting.into()))
}

pub async fn create_meeting(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateMeetingRequest>,
) -> Result<(StatusCode, Json<MeetingResponse>), AppError> {
    let now = Utc::now();
    let meeting = Meeting {
        id: new_id(),
        title: payload.title.trim().to_string(),
        agenda: payload.agenda,
        venue: payload.venue,
        link: payload.link,
        date: payload.date,
        meant_for: dedup_tags(payload.meant_for),
        created_at: now,
        updated_at: now,
    };

    state.repos.meetings.insert(&meeting).await?;
    tracing::info!(meeting_id = %meeting.id, "Meeting created");

    Ok((StatusCode::CREATED, Json(meeting.into())))
}

pub async fn update_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateMeetingRequest>,
) -> Result<Json<MeetingResponse>, AppError> {
    let mut meeting = state
        .repos
        .meetings
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Meeting not found".to_string()))?;

    if let Some(title) = payload.title {
        meeting.title = title.trim().to_string();
    }
    if let Some(agenda) = payload.agenda {
        meeting.agenda = agenda;
    }
    if let Some(venue) = payload.venue {
        meeting.venue = Some(venue);
    }
    if let Some(link) = payload.link {
        meeting.link = Some(link);
    }
    if let Some(date) = payload.date {
        meeting.date = date;
    }
    if let Some(meant_for) = payload.meant_for {
        meeting.meant_for = dedup_tags(meant_for);
    }
    meeting.updated_at = Utc::now();

    if !state.repos.meetings.replace(&meeting).await? {
        return Err(AppError::NotFound("Meeting not found".to_string()));
    }
    Ok(Json(meeting.into()))
}

pub async fn delete_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.repos.meetings.delete(&id).await? {
        return Err(AppError::NotFound("Meeting not found".to_string()));
    }
    tracing::info!(meeting_id = %id, "Meeting deleted");
    Ok(StatusCode::NO_CONTENT)
}
