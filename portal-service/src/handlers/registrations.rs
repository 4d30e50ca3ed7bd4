//! Event registrations and pledges.
//!
//! Anyone may register for an event they can see; only administrators
//! read, edit or verify.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use crate::dtos::registrations::{
    CreateRegistrationRequest, RegistrationListParams, RegistrationResponse,
    UpdateRegistrationRequest,
};
use crate::dtos::Paginated;
use crate::models::{new_id, Registration, RegistrationStatus};
use crate::policy::Principal;
use crate::services::content::get_visible;
use crate::services::{notify, ListFilter, Notification, PageRequest};
use crate::utils::ValidatedJson;
use crate::AppState;

async fn load_registration(state: &AppState, id: &str) -> Result<Registration, AppError> {
    state
        .repos
        .registrations
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))
}

/// The event, when named, must be visible to the caller.
pub async fn create_registration(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(payload): ValidatedJson<CreateRegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>), AppError> {
    if let Some(event_id) = &payload.event_id {
        get_visible(
            state.repos.events.as_ref(),
            &state.policy,
            &principal,
            event_id,
            "Event",
        )
        .await?;
    }

    let now = Utc::now();
    let registration = Registration {
        id: new_id(),
        event_id: payload.event_id,
        name: payload.name.trim().to_string(),
        email: payload.email.trim().to_lowercase(),
        phone: payload.phone,
        organization: payload.organization,
        contribution: payload.contribution.map(Into::into),
        status: RegistrationStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    state.repos.registrations.insert(&registration).await?;

    metrics::counter!("registrations_total").increment(1);
    tracing::info!(
        registration_id = %registration.id,
        event_id = ?registration.event_id,
        "Registration received"
    );

    Ok((StatusCode::CREATED, Json(registration.into())))
}

pub async fn list_registrations(
    State(state): State<AppState>,
    Query(params): Query<RegistrationListParams>,
) -> Result<Json<Paginated<RegistrationResponse>>, AppError> {
    let page = PageRequest::new(params.page, params.limit);
    let filter = ListFilter::new()
        .eq_opt("eventId", params.event_id)
        .eq_opt("status", params.status.map(|s| s.as_str()));
    let result = state.repos.registrations.list(&filter, page).await?;
    Ok(Json(Paginated::from_page(result, page)))
}

pub async fn get_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RegistrationResponse>, AppError> {
    Ok(Json(load_registration(&state, &id).await?.into()))
}

pub async fn update_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateRegistrationRequest>,
) -> Result<Json<RegistrationResponse>, AppError> {
    let mut registration = load_registration(&state, &id).await?;

    if let Some(name) = payload.name {
        registration.name = name.trim().to_string();
    }
    if let Some(email) = payload.email {
        registration.email = email.trim().to_lowercase();
    }
    if let Some(phone) = payload.phone {
        registration.phone = Some(phone);
    }
    if let Some(organization) = payload.organization {
        registration.organization = Some(organization);
    }
    if let Some(contribution) = payload.contribution {
        registration.contribution = Some(contribution.into());
    }
    if let Some(status) = payload.status {
        registration.status = status;
    }
    registration.updated_at = Utc::now();

    if !state.repos.registrations.replace(&registration).await? {
        return Err(AppError::NotFound("Registration not found".to_string()));
    }
    Ok(Json(registration.into()))
}

pub async fn delete_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.repos.registrations.delete(&id).await? {
        return Err(AppError::NotFound("Registration not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Marks a registration verified and tells the registrant.
pub async fn verify_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RegistrationResponse>, AppError> {
    let mut registration = load_registration(&state, &id).await?;

    if registration.status == RegistrationStatus::Verified {
        return Err(AppError::BadRequest(
            "Registration is already verified".to_string(),
        ));
    }

    registration.status = RegistrationStatus::Verified;
    registration.updated_at = Utc::now();
    if !state.repos.registrations.replace(&registration).await? {
        return Err(AppError::NotFound("Registration not found".to_string()));
    }

    tracing::info!(registration_id = %registration.id, "Registration verified");

    let event_title = match &registration.event_id {
        Some(event_id) => match state.repos.events.get(event_id).await {
            Ok(event) => event.map(|event| event.title),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    event_id = %event_id,
                    "Event lookup failed; sending notification without a title"
                );
                None
            }
        },
        None => None,
    };

    notify(
        state.email.as_ref(),
        Notification::RegistrationVerified {
            to: registration.email.clone(),
            name: registration.name.clone(),
            event_title,
        },
    )
    .await;

    Ok(Json(registration.into()))
}
