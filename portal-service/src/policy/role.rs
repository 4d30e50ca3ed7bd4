//! Caller roles and resource visibility tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role carried by a principal.
///
/// `Public` is never stored on a user record; it is the role of an
/// unauthenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Exco,
    Member,
    Pending,
    Blocked,
    Public,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::Exco => "exco",
            Role::Member => "member",
            Role::Pending => "pending",
            Role::Blocked => "blocked",
            Role::Public => "public",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "superadmin" => Ok(Role::Superadmin),
            "admin" => Ok(Role::Admin),
            "exco" => Ok(Role::Exco),
            "member" => Ok(Role::Member),
            "pending" => Ok(Role::Pending),
            "blocked" => Ok(Role::Blocked),
            "public" => Ok(Role::Public),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// A `meantFor` tag on a visibility-tagged resource.
///
/// Legacy records spell some tags in the plural; both spellings deserialize
/// to the same variant and only the singular form is ever written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Public,
    #[serde(alias = "members")]
    Member,
    #[serde(alias = "excos")]
    Exco,
    Admin,
}

impl Audience {
    pub const ALL: [Audience; 4] = [
        Audience::Public,
        Audience::Member,
        Audience::Exco,
        Audience::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Public => "public",
            Audience::Member => "member",
            Audience::Exco => "exco",
            Audience::Admin => "admin",
        }
    }

    /// Legacy spelling still found in older records, if any.
    pub fn legacy_alias(&self) -> Option<&'static str> {
        match self {
            Audience::Member => Some("members"),
            Audience::Exco => Some("excos"),
            Audience::Public | Audience::Admin => None,
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tags a role may see, before any administrator override.
///
/// The expansion is monotonic: admin ⊇ exco ⊇ member ⊇ public. Roles that
/// have not been admitted (pending, blocked) see only public material.
/// `superadmin` gets nothing beyond public here; it is widened only when the
/// [`PolicyTable`](super::PolicyTable) lists it as an administrator role.
pub fn expand(role: Role) -> &'static [Audience] {
    match role {
        Role::Admin => &Audience::ALL,
        Role::Exco => &[Audience::Exco, Audience::Member, Audience::Public],
        Role::Member => &[Audience::Member, Audience::Public],
        Role::Superadmin | Role::Pending | Role::Blocked | Role::Public => &[Audience::Public],
    }
}
