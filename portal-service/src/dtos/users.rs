use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::rfc3339;
use crate::models::User;
use crate::policy::Role;
use crate::utils::validation::{add_error, into_result};
use crate::utils::Rules;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub email_verified: bool,
    pub membership_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            email_verified: user.email_verified,
            membership_id: user.membership_id,
            created_at: rfc3339(user.created_at),
            updated_at: rfc3339(user.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub membership_id: Option<String>,
}

impl ApproveRequest {
    /// The trimmed identifier. Present and non-blank once `check_rules` passed.
    pub fn membership_id(&self) -> &str {
        self.membership_id.as_deref().map(str::trim).unwrap_or_default()
    }
}

impl Rules for ApproveRequest {
    fn check_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.membership_id().is_empty() {
            add_error(
                &mut errors,
                "membershipId",
                "required",
                "membershipId is required to approve a member",
            );
        }
        into_result(errors)
    }
}

/// Administrative edit of a user record. The only way out of `blocked`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(max = 32, message = "is too long"))]
    pub phone: Option<String>,
    pub role: Option<Role>,
    #[validate(length(min = 1, message = "membershipId cannot be empty"))]
    pub membership_id: Option<String>,
}

impl Rules for UpdateUserRequest {
    fn check_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.role == Some(Role::Public) {
            add_error(
                &mut errors,
                "role",
                "invalid",
                "public is not an assignable role",
            );
        }
        into_result(errors)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "name cannot be empty"))]
    pub name: Option<String>,
}

impl Rules for InviteRequest {}
