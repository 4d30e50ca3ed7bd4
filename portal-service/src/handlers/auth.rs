use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service_core::error::AppError;

use crate::dtos::auth::{
    LoginRequest, RegisterRequest, RegisterResponse, SessionResponse, VerifyEmailParams,
};
use crate::dtos::users::UserResponse;
use crate::dtos::MessageResponse;
use crate::models::User;
use crate::policy::{Principal, Role};
use crate::services::{notify, ListFilter, Notification};
use crate::utils::{hash_password, verify_password, ValidatedJson};
use crate::AppState;

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((state.config.session.cookie_name.clone(), token))
        .http_only(true)
        .secure(state.config.session.cookie_secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(state.jwt.ttl_days()))
        .path("/")
        .build()
}

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let email = payload.email.trim().to_lowercase();

    let existing = state
        .repos
        .users
        .find_one(&ListFilter::new().eq("email", email.as_str()))
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = User::new_pending(payload.name.trim().to_string(), &email, password_hash, payload.phone);
    state.repos.users.insert(&user).await?;

    tracing::info!(user_id = %user.id, "User registered; awaiting email verification");

    if let Some(token) = &user.verification_token {
        notify(
            state.email.as_ref(),
            Notification::Verification {
                to: user.email.clone(),
                name: user.name.clone(),
                link: format!(
                    "{}/api/auth/verify?token={}",
                    state.config.site.frontend_url.trim_end_matches('/'),
                    token
                ),
            },
        )
        .await;
    }

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration received. Check your email to verify your address.".to_string(),
            user: user.into(),
        }),
    ))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Query(params): Query<VerifyEmailParams>,
) -> Result<Json<MessageResponse>, AppError> {
    let token = params
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("token: verification token is required".to_string()))?;

    let mut user = state
        .repos
        .users
        .find_one(&ListFilter::new().eq("verificationToken", token))
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("Invalid or already used verification token".to_string())
        })?;

    user.email_verified = true;
    user.verification_token = None;
    user.touch();
    state.repos.users.replace(&user).await?;

    tracing::info!(user_id = %user.id, "Email verified");

    Ok(Json(MessageResponse::new(
        "Email verified. An administrator will review your membership.",
    )))
}

/// Login. Blocked accounts are refused before the password is looked at.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let email = payload.email.trim().to_lowercase();
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .repos
        .users
        .find_one(&ListFilter::new().eq("email", email.as_str()))
        .await?
        .ok_or_else(invalid)?;

    if user.role == Role::Blocked {
        tracing::info!(user_id = %user.id, "Login refused for blocked account");
        return Err(AppError::Forbidden(
            "This account has been blocked".to_string(),
        ));
    }

    if user.role == Role::Pending && !user.email_verified {
        return Err(AppError::Forbidden(
            "Please verify your email address before signing in".to_string(),
        ));
    }

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = state.jwt.issue(&user.id, user.role)?;
    let jar = jar.add(session_cookie(&state, token.clone()));

    tracing::info!(user_id = %user.id, role = %user.role, "User signed in");

    Ok((
        jar,
        Json(SessionResponse {
            user: user.into(),
            token,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let mut removal = session_cookie(&state, String::new());
    removal.make_removal();
    (jar.add(removal), Json(MessageResponse::new("Signed out")))
}

pub async fn me(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = principal.require_session()?;
    let user = state
        .repos
        .users
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user.into()))
}
