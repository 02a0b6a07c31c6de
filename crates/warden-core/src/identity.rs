use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CoreError;

/// Login prefix carried by virtual cluster identities (`clusters/<org>/<cluster>`).
pub const CLUSTER_LOGIN_PREFIX: &str = "clusters/";

/// An authenticated caller as seen by the request layer.
///
/// `id == 0` marks a virtual user: never persisted, synthesized per request
/// from a long-lived token. Its `login` encodes the scope it acts in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
}

impl User {
    #[must_use]
    pub fn new(id: u64, login: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
        }
    }

    /// A virtual user with the given login.
    #[must_use]
    pub fn virtual_user(login: impl Into<String>) -> Self {
        Self::new(0, login)
    }

    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        self.id == 0
    }
}

/// Typed identity resolved once from a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// A database-backed human user.
    Human { id: u64, login: String },
    /// A provisioned cluster acting inside its owning organization.
    ClusterService {
        organization_id: u64,
        cluster_id: Option<String>,
    },
    /// A virtual identity scoped to an organization by name.
    OrganizationService { organization_name: String },
}

impl Principal {
    /// Build the identity of a provisioned cluster.
    #[must_use]
    pub fn cluster(organization_id: u64, cluster_id: impl fmt::Display) -> Self {
        Self::ClusterService {
            organization_id,
            cluster_id: Some(cluster_id.to_string()),
        }
    }

    /// Resolve a user into its typed principal.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MalformedVirtualLogin` when a virtual login starts with
    /// `clusters/` but carries no numeric organization segment.
    pub fn from_user(user: &User) -> Result<Self, CoreError> {
        if !user.is_virtual() {
            return Ok(Self::Human {
                id: user.id,
                login: user.login.clone(),
            });
        }

        let Some(scope) = user.login.strip_prefix(CLUSTER_LOGIN_PREFIX) else {
            return Ok(Self::OrganizationService {
                organization_name: user.login.clone(),
            });
        };

        let (organization, cluster) = match scope.split_once('/') {
            Some((organization, cluster)) => (organization, Some(cluster)),
            None => (scope, None),
        };
        let organization_id = organization
            .parse::<u64>()
            .map_err(|_| CoreError::MalformedVirtualLogin(user.login.clone()))?;

        Ok(Self::ClusterService {
            organization_id,
            cluster_id: cluster.filter(|c| !c.is_empty()).map(str::to_string),
        })
    }

    /// The token subject this principal authenticates as.
    #[must_use]
    pub fn subject(&self) -> String {
        match self {
            Self::Human { login, .. } => login.clone(),
            Self::ClusterService {
                organization_id,
                cluster_id: Some(cluster_id),
            } => format!("{CLUSTER_LOGIN_PREFIX}{organization_id}/{cluster_id}"),
            Self::ClusterService {
                organization_id,
                cluster_id: None,
            } => format!("{CLUSTER_LOGIN_PREFIX}{organization_id}"),
            Self::OrganizationService { organization_name } => organization_name.clone(),
        }
    }

    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        !matches!(self, Self::Human { .. })
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.subject())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn human_user_resolves_to_human() {
        let principal = Principal::from_user(&User::new(42, "octocat")).unwrap();
        assert_eq!(
            principal,
            Principal::Human {
                id: 42,
                login: "octocat".into()
            }
        );
        assert!(!principal.is_virtual());
    }

    #[rstest]
    #[case("clusters/1", 1, None)]
    #[case("clusters/1/", 1, None)]
    #[case("clusters/7/19", 7, Some("19"))]
    #[case("clusters/7/anything/else", 7, Some("anything/else"))]
    fn cluster_login_resolves_scope(
        #[case] login: &str,
        #[case] organization_id: u64,
        #[case] cluster_id: Option<&str>,
    ) {
        let principal = Principal::from_user(&User::virtual_user(login)).unwrap();
        assert_eq!(
            principal,
            Principal::ClusterService {
                organization_id,
                cluster_id: cluster_id.map(str::to_string),
            }
        );
    }

    #[rstest]
    #[case("clusters/example")]
    #[case("clusters/")]
    #[case("clusters//3")]
    #[case("clusters/-1/3")]
    fn malformed_cluster_login_is_rejected(#[case] login: &str) {
        let err = Principal::from_user(&User::virtual_user(login)).unwrap_err();
        assert_eq!(err, CoreError::MalformedVirtualLogin(login.into()));
    }

    #[test]
    fn other_virtual_login_is_organization_scoped() {
        let principal = Principal::from_user(&User::virtual_user("acme")).unwrap();
        assert_eq!(
            principal,
            Principal::OrganizationService {
                organization_name: "acme".into()
            }
        );
    }

    #[test]
    fn cluster_subject_round_trips_through_user() {
        let principal = Principal::cluster(3, 12);
        assert_eq!(principal.subject(), "clusters/3/12");
        let resolved = Principal::from_user(&User::virtual_user(principal.subject())).unwrap();
        assert_eq!(resolved, principal);
    }
}
