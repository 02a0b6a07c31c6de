//! Role enum for organization-scoped RBAC.
//!
//! Roles serialize as lowercase strings. The derive order of the variants is
//! the privilege order, so `Ord` can be used to pick the stronger of two roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// A user's role within one organization.
///
/// ```text
/// member < admin
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    /// Every known role, lowest privilege first.
    pub const ALL: [Self; 2] = [Self::Member, Self::Admin];

    /// The least privileged role.
    #[must_use]
    pub const fn lowest() -> Self {
        Self::Member
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }

    /// Check whether this role carries strictly more privilege than `other`.
    #[must_use]
    pub fn outranks(self, other: Self) -> bool {
        self > other
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| CoreError::UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_is_lowest() {
        assert_eq!(Role::lowest(), Role::Member);
        assert!(Role::Member < Role::Admin);
        assert!(Role::Admin.outranks(Role::Member));
        assert!(!Role::Member.outranks(Role::Member));
    }

    #[test]
    fn parses_known_roles() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("member".parse::<Role>(), Ok(Role::Member));
    }

    #[test]
    fn rejects_unknown_role() {
        assert_eq!(
            "owner".parse::<Role>(),
            Err(CoreError::UnknownRole("owner".into()))
        );
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Role::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
        let role: Role = serde_json::from_str("\"member\"").unwrap();
        assert_eq!(role, Role::Member);
    }
}
