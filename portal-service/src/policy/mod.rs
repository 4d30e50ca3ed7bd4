//! Role policy: who may see or change what.
//!
//! Every authorization decision in the service goes through [`PolicyTable`].
//! Route groups declare an [`Access`] level; visibility-tagged resources are
//! filtered with [`PolicyTable::can_view`] or [`PolicyTable::visible_tags`].

pub mod principal;
pub mod role;

pub use principal::{AuthFailure, Credential, Principal};
pub use role::{expand, Audience, Role};

use service_core::error::AppError;
use std::collections::BTreeSet;

/// Access level declared for a group of routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, including anonymous callers. A rejected token degrades to an
    /// anonymous principal so public material stays reachable.
    Open,
    /// Any caller holding a valid session.
    Authenticated,
    /// A valid session whose role the table lists as administrator.
    Admin,
}

/// Reviewed role configuration.
///
/// Which roles count as administrators is configuration, not something each
/// handler decides on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    admin_roles: BTreeSet<Role>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new([Role::Admin, Role::Superadmin])
    }
}

impl PolicyTable {
    /// `Role::Admin` is always an administrator, whatever else is listed.
    pub fn new(admin_roles: impl IntoIterator<Item = Role>) -> Self {
        let mut admin_roles: BTreeSet<Role> = admin_roles
            .into_iter()
            .filter(|r| !matches!(r, Role::Public | Role::Pending | Role::Blocked))
            .collect();
        admin_roles.insert(Role::Admin);
        Self { admin_roles }
    }

    /// Parses a comma separated role list such as `admin,superadmin`.
    pub fn from_list(list: &str) -> Result<Self, AppError> {
        let roles = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Role>()
                    .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(roles))
    }

    pub fn admin_roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.admin_roles.iter().copied()
    }

    pub fn is_admin(&self, role: Role) -> bool {
        self.admin_roles.contains(&role)
    }

    /// Tags visible to `role`, or `None` when the role sees everything.
    pub fn visible_tags(&self, role: Role) -> Option<&'static [Audience]> {
        if self.is_admin(role) {
            None
        } else {
            Some(expand(role))
        }
    }

    /// Whether a resource tagged `tags` is visible to `role`.
    pub fn can_view(&self, role: Role, tags: &[Audience]) -> bool {
        match self.visible_tags(role) {
            None => true,
            Some(visible) => tags.iter().any(|t| visible.contains(t)),
        }
    }

    /// Checks a principal against a route's declared access level.
    pub fn check(&self, principal: &Principal, access: Access) -> Result<(), AppError> {
        match access {
            Access::Open => Ok(()),
            Access::Authenticated => principal.require_session().map(|_| ()),
            Access::Admin => {
                principal.require_session()?;
                if self.is_admin(principal.role) {
                    Ok(())
                } else {
                    Err(AppError::Forbidden(
                        "Administrator access required".to_string(),
                    ))
                }
            }
        }
    }

    /// Decides a read of one tagged resource.
    ///
    /// Callers without a usable session get 401 (the resource might be
    /// visible after signing in); signed-in callers get 403.
    pub fn authorize_view(&self, principal: &Principal, tags: &[Audience]) -> Result<(), AppError> {
        if self.can_view(principal.role, tags) {
            return Ok(());
        }
        principal.require_session()?;
        Err(AppError::Forbidden(
            "You do not have access to this resource".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [Role; 7] = [
        Role::Superadmin,
        Role::Admin,
        Role::Exco,
        Role::Member,
        Role::Pending,
        Role::Blocked,
        Role::Public,
    ];

    /// Every subset of the four tags.
    fn tag_sets() -> Vec<Vec<Audience>> {
        (0u8..16)
            .map(|mask| {
                Audience::ALL
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, t)| *t)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn visibility_matches_admin_or_intersection() {
        let table = PolicyTable::new([Role::Admin]);
        for role in ROLES {
            for tags in tag_sets() {
                let expected =
                    role == Role::Admin || tags.iter().any(|t| expand(role).contains(t));
                assert_eq!(
                    table.can_view(role, &tags),
                    expected,
                    "role {:?} tags {:?}",
                    role,
                    tags
                );
            }
        }
    }

    #[test]
    fn member_sees_member_and_public_but_not_exco_or_admin() {
        let table = PolicyTable::default();
        assert!(table.can_view(Role::Member, &[Audience::Member]));
        assert!(table.can_view(Role::Member, &[Audience::Public]));
        assert!(!table.can_view(Role::Member, &[Audience::Exco]));
        assert!(!table.can_view(Role::Member, &[Audience::Admin]));
    }

    #[test]
    fn exco_sees_exco_member_and_public() {
        let table = PolicyTable::default();
        assert!(table.can_view(Role::Exco, &[Audience::Exco]));
        assert!(table.can_view(Role::Exco, &[Audience::Member]));
        assert!(table.can_view(Role::Exco, &[Audience::Public]));
        assert!(!table.can_view(Role::Exco, &[Audience::Admin]));
    }

    #[test]
    fn pending_and_blocked_are_denied_everything_but_public() {
        let table = PolicyTable::default();
        for role in [Role::Pending, Role::Blocked] {
            assert!(table.can_view(role, &[Audience::Public]));
            for tag in [Audience::Member, Audience::Exco, Audience::Admin] {
                assert!(!table.can_view(role, &[tag]), "{:?} saw {:?}", role, tag);
            }
        }
    }

    #[test]
    fn empty_tag_set_is_visible_to_administrators_only() {
        let table = PolicyTable::default();
        assert!(table.can_view(Role::Admin, &[]));
        assert!(!table.can_view(Role::Exco, &[]));
        assert!(!table.can_view(Role::Public, &[]));
    }

    #[test]
    fn superadmin_follows_the_table() {
        let with = PolicyTable::default();
        let without = PolicyTable::new([Role::Admin]);

        assert!(with.is_admin(Role::Superadmin));
        assert!(with.can_view(Role::Superadmin, &[Audience::Admin]));

        assert!(!without.is_admin(Role::Superadmin));
        assert!(!without.can_view(Role::Superadmin, &[Audience::Admin]));
    }

    #[test]
    fn admin_is_always_listed() {
        let table = PolicyTable::new([Role::Superadmin]);
        assert!(table.is_admin(Role::Admin));
    }

    #[test]
    fn unadmitted_roles_cannot_be_configured_as_admins() {
        let table = PolicyTable::from_list("admin, pending, blocked").unwrap();
        assert!(!table.is_admin(Role::Pending));
        assert!(!table.is_admin(Role::Blocked));
    }

    #[test]
    fn from_list_rejects_unknown_roles() {
        assert!(PolicyTable::from_list("admin,root").is_err());
    }

    #[test]
    fn check_distinguishes_missing_session_from_insufficient_role() {
        let table = PolicyTable::default();

        let anonymous = Principal::anonymous();
        assert!(matches!(
            table.check(&anonymous, Access::Admin),
            Err(AppError::Unauthorized(_))
        ));

        let member = Principal::verified("u1".into(), Role::Member);
        assert!(matches!(
            table.check(&member, Access::Admin),
            Err(AppError::Forbidden(_))
        ));
        assert!(table.check(&member, Access::Authenticated).is_ok());

        let superadmin = Principal::verified("u2".into(), Role::Superadmin);
        assert!(table.check(&superadmin, Access::Admin).is_ok());
    }

    #[test]
    fn rejected_token_falls_back_to_public_material() {
        let table = PolicyTable::default();
        let rejected = Principal::rejected(AuthFailure::Expired);

        assert!(table.authorize_view(&rejected, &[Audience::Public]).is_ok());
        assert!(matches!(
            table.authorize_view(&rejected, &[Audience::Member]),
            Err(AppError::ExpiredToken)
        ));
    }

    #[test]
    fn authorize_view_forbids_signed_in_callers_without_the_tag() {
        let table = PolicyTable::default();
        let member = Principal::verified("u1".into(), Role::Member);
        assert!(matches!(
            table.authorize_view(&member, &[Audience::Exco]),
            Err(AppError::Forbidden(_))
        ));
    }
}
