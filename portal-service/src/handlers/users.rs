//! Administrative user management and the approval workflow.
//!
//! `pending` moves to `member` by approval or to `blocked` by decline.
//! Leaving `blocked` is only possible through [`update_user`].

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use reqwest::Url;
use service_core::error::AppError;

use crate::dtos::users::{
    ApproveRequest, InviteRequest, UpdateUserRequest, UserListParams, UserResponse,
};
use crate::dtos::{MessageResponse, Paginated};
use crate::models::User;
use crate::policy::{Principal, Role};
use crate::services::{notify, ListFilter, Notification, PageRequest};
use crate::utils::ValidatedJson;
use crate::AppState;

async fn load_user(state: &AppState, id: &str) -> Result<User, AppError> {
    state
        .repos
        .users
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

async fn save_user(state: &AppState, user: &User) -> Result<(), AppError> {
    if state.repos.users.replace(user).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("User not found".to_string()))
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> Result<Json<Paginated<UserResponse>>, AppError> {
    let page = PageRequest::new(params.page, params.limit);
    let filter = ListFilter::new().eq_opt("role", params.role);
    let result = state.repos.users.list(&filter, page).await?;
    Ok(Json(Paginated::from_page(result, page)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(load_user(&state, &id).await?.into()))
}

pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let mut user = load_user(&state, &id).await?;
    let previous_role = user.role;

    if let Some(name) = payload.name {
        user.name = name.trim().to_string();
    }
    if let Some(phone) = payload.phone {
        user.phone = Some(phone);
    }
    if let Some(membership_id) = payload.membership_id {
        user.membership_id = Some(membership_id.trim().to_string());
    }
    if let Some(role) = payload.role {
        user.role = role;
    }
    user.touch();
    save_user(&state, &user).await?;

    if previous_role != user.role {
        tracing::info!(
            user_id = %user.id,
            from = %previous_role,
            to = %user.role,
            by = principal.user_id.as_deref().unwrap_or("-"),
            "User role changed by administrator"
        );
    }

    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if principal.user_id.as_deref() == Some(id.as_str()) {
        return Err(AppError::BadRequest(
            "Administrators cannot delete their own account".to_string(),
        ));
    }
    if !state.repos.users.delete(&id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `pending -> member`. The membership id is checked by the extractor, so a
/// request without one never reaches the store.
pub async fn approve_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<ApproveRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let membership_id = payload.membership_id().to_string();
    let mut user = load_user(&state, &id).await?;

    if user.role != Role::Pending {
        return Err(AppError::BadRequest(format!(
            "Only pending users can be approved (user is {})",
            user.role
        )));
    }
    if !user.email_verified {
        return Err(AppError::BadRequest(
            "User has not verified their email address".to_string(),
        ));
    }

    user.role = Role::Member;
    user.membership_id = Some(membership_id.clone());
    user.touch();
    save_user(&state, &user).await?;

    tracing::info!(user_id = %user.id, membership_id = %membership_id, "User approved");

    notify(
        state.email.as_ref(),
        Notification::Approved {
            to: user.email.clone(),
            name: user.name.clone(),
            membership_id,
        },
    )
    .await;

    Ok(Json(user.into()))
}

/// `pending -> blocked`.
pub async fn decline_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let mut user = load_user(&state, &id).await?;

    if user.role != Role::Pending {
        return Err(AppError::BadRequest(format!(
            "Only pending users can be declined (user is {})",
            user.role
        )));
    }

    user.role = Role::Blocked;
    user.touch();
    save_user(&state, &user).await?;

    tracing::info!(user_id = %user.id, "User declined");

    notify(
        state.email.as_ref(),
        Notification::Declined {
            to: user.email.clone(),
            name: user.name.clone(),
        },
    )
    .await;

    Ok(Json(user.into()))
}

pub async fn invite_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<InviteRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let email = payload.email.trim().to_lowercase();

    if state
        .repos
        .users
        .find_one(&ListFilter::new().eq("email", email.as_str()))
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let link = Url::parse_with_params(
        &format!(
            "{}/register",
            state.config.site.frontend_url.trim_end_matches('/')
        ),
        &[("email", email.as_str())],
    )
    .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid FRONTEND_URL: {}", e)))?;

    notify(
        state.email.as_ref(),
        Notification::Invite {
            to: email.clone(),
            name: payload.name,
            link: link.into(),
        },
    )
    .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(format!("Invitation sent to {}", email))),
    ))
}
