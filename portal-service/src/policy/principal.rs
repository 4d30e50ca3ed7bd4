use super::Role;
use service_core::error::AppError;

/// Why a presented token was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    Invalid,
    Expired,
}

/// How the caller's identity was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    /// No token was presented.
    Anonymous,
    /// A token was presented and verified.
    Verified,
    /// A token was presented but rejected; the caller is treated as public.
    Rejected(AuthFailure),
}

/// The caller of a request, authenticated or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Option<String>,
    pub role: Role,
    pub credential: Credential,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Public,
            credential: Credential::Anonymous,
        }
    }

    pub fn rejected(failure: AuthFailure) -> Self {
        Self {
            user_id: None,
            role: Role::Public,
            credential: Credential::Rejected(failure),
        }
    }

    pub fn verified(user_id: String, role: Role) -> Self {
        Self {
            user_id: Some(user_id),
            role,
            credential: Credential::Verified,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential == Credential::Verified
    }

    /// Returns the session's user id, or the 401 matching how the session
    /// is missing.
    pub fn require_session(&self) -> Result<&str, AppError> {
        match (&self.credential, &self.user_id) {
            (Credential::Verified, Some(id)) => Ok(id),
            (Credential::Rejected(AuthFailure::Expired), _) => Err(AppError::ExpiredToken),
            (Credential::Rejected(AuthFailure::Invalid), _) => Err(AppError::InvalidToken(
                "Session token could not be verified".to_string(),
            )),
            _ => Err(AppError::Unauthorized(
                "Authentication required".to_string(),
            )),
        }
    }
}
