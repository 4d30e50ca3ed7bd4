use serde::{Deserialize, Serialize};
use validator::Validate;

use super::users::UserResponse;
use crate::utils::Rules;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub password: String,
    #[validate(length(max = 32, message = "is too long"))]
    pub phone: Option<String>,
}

impl Rules for RegisterRequest {}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

impl Rules for LoginRequest {}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailParams {
    pub token: Option<String>,
}

/// Returned by login: the user plus the session token for bearer clients.
/// The same token is also set as the session cookie.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserResponse,
}
