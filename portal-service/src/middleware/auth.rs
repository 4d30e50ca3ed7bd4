//! Request authorization.
//!
//! [`authorize`] is layered onto every route group with the group's
//! [`Access`] level. It resolves the caller into a [`Principal`], enforces
//! the level through the [`PolicyTable`](crate::policy::PolicyTable), and
//! leaves the principal in the request extensions for handlers.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use crate::policy::{Access, AuthFailure, Principal};
use crate::AppState;

/// The session token, preferring the cookie over an `Authorization: Bearer`
/// header when both are present.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Turns the request's credential into a principal.
///
/// A missing token yields an anonymous principal; a token that fails
/// verification yields a rejected one. Neither is an error here: whether the
/// route can still be served is the policy's decision.
pub async fn resolve_principal(state: &AppState, headers: &HeaderMap) -> Principal {
    let Some(token) = extract_token(headers, &state.config.session.cookie_name) else {
        return Principal::anonymous();
    };

    let claims = match state.jwt.verify(&token) {
        Ok(claims) => claims,
        Err(AppError::ExpiredToken) => return Principal::rejected(AuthFailure::Expired),
        Err(e) => {
            tracing::debug!(error = %e, "Session token rejected");
            return Principal::rejected(AuthFailure::Invalid);
        }
    };

    if !state.config.session.reverify_role {
        return Principal::verified(claims.sub, claims.role);
    }

    // The stored role wins over the one frozen into the token. When the
    // store cannot answer, the caller is treated as unverified.
    let stored = match state.repos.users.get(&claims.sub).await {
        Ok(stored) => stored,
        Err(e) => {
            tracing::error!(
                error = %e,
                user_id = %claims.sub,
                "Role re-check failed; treating session as unverified"
            );
            return Principal::rejected(AuthFailure::Invalid);
        }
    };

    match stored {
        Some(user) => {
            if user.role != claims.role {
                tracing::info!(
                    user_id = %user.id,
                    token_role = %claims.role,
                    stored_role = %user.role,
                    "Session role superseded by stored role"
                );
            }
            Principal::verified(user.id, user.role)
        }
        None => {
            tracing::warn!(user_id = %claims.sub, "Session token for unknown user");
            Principal::rejected(AuthFailure::Invalid)
        }
    }
}

pub async fn authorize(
    State((state, access)): State<(AppState, Access)>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = resolve_principal(&state, req.headers()).await;

    let span = tracing::Span::current();
    if let Some(user_id) = &principal.user_id {
        span.record("user_id", user_id.as_str());
    }
    span.record("role", principal.role.as_str());

    let access_label = match access {
        Access::Open => "open",
        Access::Authenticated => "authenticated",
        Access::Admin => "admin",
    };

    if let Err(e) = state.policy.check(&principal, access) {
        metrics::counter!("authz_decisions_total", "kind" => access_label, "outcome" => "deny")
            .increment(1);
        tracing::info!(
            role = %principal.role,
            access = access_label,
            path = %req.uri().path(),
            "Request denied by policy"
        );
        return Err(e);
    }
    metrics::counter!("authz_decisions_total", "kind" => access_label, "outcome" => "allow")
        .increment(1);

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Principal>().cloned().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Principal missing from request extensions; is the route behind `authorize`?"
            ))
        })
    }
}
