use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use crate::dtos::sponsors::{CreateSponsorRequest, SponsorResponse, UpdateSponsorRequest};
use crate::dtos::{PageParams, Paginated};
use crate::models::{new_id, Sponsor};
use crate::policy::Principal;
use crate::services::{ListFilter, PageRequest};
use crate::utils::ValidatedJson;
use crate::AppState;

/// Inactive sponsors are listed for administrators only.
pub async fn list_sponsors(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<SponsorResponse>>, AppError> {
    let page = PageRequest::from(params);
    let filter = if principal.is_authenticated() && state.policy.is_admin(principal.role) {
        ListFilter::new()
    } else {
        ListFilter::new().eq("active", true)
    };
    let result = state.repos.sponsors.list(&filter, page).await?;
    Ok(Json(Paginated::from_page(result, page)))
}

pub async fn create_sponsor(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateSponsorRequest>,
) -> Result<(StatusCode, Json<SponsorResponse>), AppError> {
    let now = Utc::now();
    let sponsor = Sponsor {
        id: new_id(),
        name: payload.name.trim().to_string(),
        logo_url: payload.logo_url,
        website: payload.website,
        tier: payload.tier,
        active: payload.active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };

    state.repos.sponsors.insert(&sponsor).await?;
    tracing::info!(sponsor_id = %sponsor.id, "Sponsor added");

    Ok((StatusCode::CREATED, Json(sponsor.into())))
}

pub async fn update_sponsor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateSponsorRequest>,
) -> Result<Json<SponsorResponse>, AppError> {
    let mut sponsor = state
        .repos
        .sponsors
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Sponsor not found".to_string()))?;

    if let Some(name) = payload.name {
        sponsor.name = name.trim().to_string();
    }
    if let Some(logo_url) = payload.logo_url {
        sponsor.logo_url = Some(logo_url);
    }
    if let Some(website) = payload.website {
        sponsor.website = Some(website);
    }
    if let Some(tier) = payload.tier {
        sponsor.tier = Some(tier);
    }
    if let Some(active) = payload.active {
        sponsor.active = active;
    }
    sponsor.updated_at = Utc::now();

    if !state.repos.sponsors.replace(&sponsor).await? {
        return Err(AppError::NotFound("Sponsor not found".to_string()));
    }
    Ok(Json(sponsor.into()))
}

pub async fn delete_sponsor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.repos.sponsors.delete(&id).await? {
        return Err(AppError::NotFound("Sponsor not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
