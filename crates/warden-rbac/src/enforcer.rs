//! The authorization decision point.

use std::sync::Arc;

use async_trait::async_trait;
use warden_config::RbacConfig;
use warden_core::{Organization, Principal, Role, User};

use crate::error::RbacError;
use crate::policy::{PolicyEngine, PolicyRuleSource, policy_from_config};

/// Role lookups against the membership relation.
#[async_trait]
pub trait RoleSource: Send + Sync {
    /// The user's role in the organization, `None` when not a member.
    async fn find_user_role(
        &self,
        organization_id: u64,
        user_id: u64,
    ) -> Result<Option<Role>, RbacError>;
}

/// Decides whether a principal may act on an organization's resources.
///
/// Roles are looked up on every call, so membership changes apply at once.
/// Shared freely between tasks.
#[derive(Clone)]
pub struct AccessEnforcer {
    roles: Arc<dyn RoleSource>,
    policy: Arc<dyn PolicyEngine>,
}

impl AccessEnforcer {
    #[must_use]
    pub fn new(roles: Arc<dyn RoleSource>, policy: Arc<dyn PolicyEngine>) -> Self {
        Self { roles, policy }
    }

    /// Build with the engine selected by `config`, refreshing rules from
    /// `rule_source` when one is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured policy rules are invalid.
    pub fn from_config(
        config: &RbacConfig,
        roles: Arc<dyn RoleSource>,
        rule_source: Option<Arc<dyn PolicyRuleSource>>,
    ) -> Result<Self, RbacError> {
        Ok(Self::new(roles, policy_from_config(config, rule_source)?))
    }

    /// Decide a request by `user` against `organization`.
    ///
    /// No user is denied; no organization means an organization-independent
    /// endpoint and is allowed.
    ///
    /// # Errors
    ///
    /// Returns `RbacError::MalformedPrincipal` for a virtual login claiming a
    /// cluster scope without a numeric organization, or a role lookup error.
    pub async fn enforce(
        &self,
        organization: Option<&Organization>,
        user: Option<&User>,
        path: &str,
        method: &str,
    ) -> Result<bool, RbacError> {
        let Some(user) = user else {
            return Ok(false);
        };
        let Some(organization) = organization else {
            return Ok(true);
        };
        let principal = Principal::from_user(user)
            .map_err(|_| RbacError::MalformedPrincipal(user.login.clone()))?;
        self.enforce_principal(organization, &principal, path, method)
            .await
    }

    /// Decide a request by an already resolved principal.
    ///
    /// # Errors
    ///
    /// Returns a role lookup error.
    pub async fn enforce_principal(
        &self,
        organization: &Organization,
        principal: &Principal,
        path: &str,
        method: &str,
    ) -> Result<bool, RbacError> {
        match principal {
            Principal::ClusterService {
                organization_id, ..
            } => Ok(*organization_id == organization.id),
            Principal::OrganizationService { organization_name } => {
                Ok(*organization_name == organization.name)
            }
            Principal::Human { id, .. } => {
                let Some(role) = self.roles.find_user_role(organization.id, *id).await? else {
                    tracing::debug!(
                        organization_id = organization.id,
                        user_id = *id,
                        "user is not a member"
                    );
                    return Ok(false);
                };
                Ok(self.policy.permits(role, path, method))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::StaticPolicy;
    use std::collections::HashMap;

    struct FixedRoles(HashMap<(u64, u64), Role>);

    #[async_trait]
    impl RoleSource for FixedRoles {
        async fn find_user_role(
            &self,
            organization_id: u64,
            user_id: u64,
        ) -> Result<Option<Role>, RbacError> {
            Ok(self.0.get(&(organization_id, user_id)).copied())
        }
    }

    struct BrokenRoles;

    #[async_trait]
    impl RoleSource for BrokenRoles {
        async fn find_user_role(&self, _: u64, _: u64) -> Result<Option<Role>, RbacError> {
            Err(RbacError::Store("connection refused".into()))
        }
    }

    fn org(id: u64) -> Organization {
        Organization {
            id,
            name: format!("org-{id}"),
            provider: "github".into(),
        }
    }

    fn enforcer() -> AccessEnforcer {
        let roles = HashMap::from([((1, 10), Role::Admin), ((1, 20), Role::Member)]);
        AccessEnforcer::new(Arc::new(FixedRoles(roles)), Arc::new(StaticPolicy))
    }

    #[tokio::test]
    async fn missing_user_or_org() {
        let enforcer = enforcer();
        let user = User::new(10, "admin");
        assert!(enforcer.enforce(None, Some(&user), "/", "GET").await.unwrap());
        assert!(!enforcer.enforce(Some(&org(1)), None, "/", "GET").await.unwrap());
    }

    #[tokio::test]
    async fn virtual_cluster_user_is_scoped_to_its_org() {
        let enforcer = enforcer();
        let user = User::virtual_user("clusters/1");
        assert!(enforcer.enforce(Some(&org(1)), Some(&user), "/", "GET").await.unwrap());
        assert!(!enforcer.enforce(Some(&org(2)), Some(&user), "/", "GET").await.unwrap());

        let cluster = User::virtual_user("clusters/1/prod");
        assert!(enforcer
            .enforce(Some(&org(1)), Some(&cluster), "/api/v1/orgs/1/secrets", "POST")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn malformed_virtual_login_is_an_error() {
        let enforcer = enforcer();
        let user = User::virtual_user("clusters/example");
        let err = enforcer
            .enforce(Some(&org(1)), Some(&user), "/", "GET")
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::MalformedPrincipal(login) if login == "clusters/example"));
    }

    #[tokio::test]
    async fn virtual_org_user_matches_by_name() {
        let enforcer = enforcer();
        let user = User::virtual_user("org-1");
        assert!(enforcer.enforce(Some(&org(1)), Some(&user), "/", "GET").await.unwrap());
        assert!(!enforcer.enforce(Some(&org(2)), Some(&user), "/", "GET").await.unwrap());
    }

    #[tokio::test]
    async fn human_roles_follow_policy() {
        let enforcer = enforcer();
        let admin = User::new(10, "admin");
        let member = User::new(20, "member");
        let outsider = User::new(30, "outsider");
        let org = org(1);

        let secrets = "/api/v1/orgs/1/secrets";
        let clusters = "/api/v1/orgs/1/clusters";
        assert!(enforcer.enforce(Some(&org), Some(&admin), secrets, "POST").await.unwrap());
        assert!(!enforcer.enforce(Some(&org), Some(&member), secrets, "POST").await.unwrap());
        assert!(!enforcer.enforce(Some(&org), Some(&member), clusters, "POST").await.unwrap());
        assert!(enforcer.enforce(Some(&org), Some(&member), clusters, "GET").await.unwrap());
        assert!(!enforcer.enforce(Some(&org), Some(&outsider), "/", "GET").await.unwrap());
    }

    #[tokio::test]
    async fn role_lookup_errors_propagate() {
        let enforcer = AccessEnforcer::new(Arc::new(BrokenRoles), Arc::new(StaticPolicy));
        let user = User::new(1, "alice");
        assert!(matches!(
            enforcer.enforce(Some(&org(1)), Some(&user), "/", "GET").await,
            Err(RbacError::Store(_))
        ));
    }
}
