//! Reconciliation of a user's organization memberships with upstream state.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use warden_core::{Membership, Organization, Role, UpstreamMembership, UpstreamOrganization, User};

use crate::binding::RoleBinder;
use crate::error::RbacError;

/// Membership side of the organization data source.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Return the organization called `name`, creating it if needed.
    /// The flag is `true` when this call created it.
    async fn ensure_organization(
        &self,
        name: &str,
        provider: &str,
    ) -> Result<(Organization, bool), RbacError>;

    async fn memberships(&self, user_id: u64) -> Result<Vec<Membership>, RbacError>;

    async fn add_member(
        &self,
        organization_id: u64,
        user_id: u64,
        role: Role,
    ) -> Result<(), RbacError>;

    async fn update_role(
        &self,
        organization_id: u64,
        user_id: u64,
        role: Role,
    ) -> Result<(), RbacError>;

    async fn remove_member(&self, organization_id: u64, user_id: u64) -> Result<(), RbacError>;
}

/// Receives notifications about organizations created during sync.
pub trait OrganizationEvents: Send + Sync {
    fn organization_created(&self, organization: &Organization, user_id: u64);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl OrganizationEvents for NoopEvents {
    fn organization_created(&self, _organization: &Organization, _user_id: u64) {}
}

/// Supplies the organizations and group claims a user has upstream.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn organizations(&self, user: &User) -> Result<Vec<UpstreamOrganization>, RbacError>;
}

/// Mutations performed by one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl SyncReport {
    /// Whether the run changed any membership.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0
    }
}

/// Converges stored memberships onto the upstream view.
///
/// Not serialised internally: concurrent runs for the same user may race.
pub struct OrganizationSyncer {
    store: Arc<dyn OrganizationStore>,
    events: Arc<dyn OrganizationEvents>,
    binder: RoleBinder,
}

impl OrganizationSyncer {
    #[must_use]
    pub fn new(
        store: Arc<dyn OrganizationStore>,
        events: Arc<dyn OrganizationEvents>,
        binder: RoleBinder,
    ) -> Self {
        Self {
            store,
            events,
            binder,
        }
    }

    /// Reconcile `user`'s memberships with `upstream`.
    ///
    /// Organizations are created as needed but never deleted. Each changed
    /// membership costs one store call; an unchanged input costs none.
    ///
    /// # Errors
    ///
    /// Returns the first store error; earlier mutations are not rolled back.
    pub async fn sync_organizations(
        &self,
        user: &User,
        upstream: &[UpstreamMembership],
    ) -> Result<SyncReport, RbacError> {
        let mut report = SyncReport::default();
        let mut wanted: BTreeMap<u64, (Organization, Role)> = BTreeMap::new();

        for membership in upstream {
            let (organization, created) = self
                .store
                .ensure_organization(&membership.name, &membership.provider)
                .await?;
            if created {
                tracing::debug!(
                    organization_id = organization.id,
                    organization = %organization.name,
                    "created organization"
                );
                self.events.organization_created(&organization, user.id);
                report.created += 1;
            }
            wanted.insert(organization.id, (organization, membership.role));
        }

        for current in self.store.memberships(user.id).await? {
            let organization_id = current.organization.id;
            match wanted.remove(&organization_id) {
                None => {
                    self.store.remove_member(organization_id, user.id).await?;
                    tracing::debug!(organization_id, user_id = user.id, "removed membership");
                    report.removed += 1;
                }
                Some((_, role)) if role != current.role => {
                    self.store
                        .update_role(organization_id, user.id, role)
                        .await?;
                    tracing::debug!(organization_id, user_id = user.id, %role, "updated role");
                    report.updated += 1;
                }
                Some(_) => {}
            }
        }

        for (organization_id, (_, role)) in wanted {
            self.store.add_member(organization_id, user.id, role).await?;
            tracing::debug!(organization_id, user_id = user.id, %role, "added membership");
            report.added += 1;
        }

        Ok(report)
    }

    /// Fetch the user's upstream organizations, bind each one's groups to a
    /// role and reconcile.
    ///
    /// # Errors
    ///
    /// Returns provider or store errors.
    pub async fn sync_from_provider(
        &self,
        user: &User,
        provider: &dyn IdentityProvider,
    ) -> Result<SyncReport, RbacError> {
        let upstream: Vec<UpstreamMembership> = provider
            .organizations(user)
            .await?
            .into_iter()
            .map(|organization| {
                let role = self.binder.bind_role(&organization.groups);
                UpstreamMembership::new(organization.name, organization.provider, role)
            })
            .collect();
        self.sync_organizations(user, &upstream).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryOrganizationStore;
    use pretty_assertions::assert_eq;

    struct StaticProvider(Vec<UpstreamOrganization>);

    #[async_trait]
    impl IdentityProvider for StaticProvider {
        async fn organizations(
            &self,
            _user: &User,
        ) -> Result<Vec<UpstreamOrganization>, RbacError> {
            Ok(self.0.clone())
        }
    }

    struct UnreachableProvider;

    #[async_trait]
    impl IdentityProvider for UnreachableProvider {
        async fn organizations(
            &self,
            _user: &User,
        ) -> Result<Vec<UpstreamOrganization>, RbacError> {
            Err(RbacError::IdentityProvider("github: 502 bad gateway".into()))
        }
    }

    fn syncer(store: Arc<MemoryOrganizationStore>) -> OrganizationSyncer {
        let binder = RoleBinder::with_member_default([("admin", "^admins$")]).unwrap();
        OrganizationSyncer::new(store, Arc::new(NoopEvents), binder)
    }

    #[tokio::test]
    async fn first_sync_creates_and_adds() {
        let store = Arc::new(MemoryOrganizationStore::new());
        let user = User::new(1, "alice");
        let report = syncer(store.clone())
            .sync_organizations(
                &user,
                &[UpstreamMembership::new("acme", "github", Role::Admin)],
            )
            .await
            .unwrap();

        assert_eq!(
            report,
            SyncReport {
                created: 1,
                added: 1,
                updated: 0,
                removed: 0,
            }
        );
        let memberships = store.memberships(1).await.unwrap();
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].role, Role::Admin);
    }

    #[tokio::test]
    async fn empty_upstream_removes_everything() {
        let store = Arc::new(MemoryOrganizationStore::new());
        let user = User::new(1, "alice");
        let syncer = syncer(store.clone());
        syncer
            .sync_organizations(&user, &[UpstreamMembership::new("a", "github", Role::Member)])
            .await
            .unwrap();

        let report = syncer.sync_organizations(&user, &[]).await.unwrap();
        assert_eq!(report.removed, 1);
        assert!(store.memberships(1).await.unwrap().is_empty());
        assert!(store.organization("a").await.is_some());
    }

    #[tokio::test]
    async fn provider_groups_are_bound_to_roles() {
        let store = Arc::new(MemoryOrganizationStore::new());
        let provider = StaticProvider(vec![
            UpstreamOrganization {
                name: "ops".into(),
                provider: "github".into(),
                groups: vec!["admins".into()],
            },
            UpstreamOrganization {
                name: "dev".into(),
                provider: "github".into(),
                groups: vec!["engineers".into()],
            },
        ]);

        let report = syncer(store.clone())
            .sync_from_provider(&User::new(9, "bob"), &provider)
            .await
            .unwrap();
        assert_eq!(report.added, 2);

        let ops = store.organization("ops").await.unwrap();
        let dev = store.organization("dev").await.unwrap();
        assert_eq!(store.role_of(ops.id, 9).await, Some(Role::Admin));
        assert_eq!(store.role_of(dev.id, 9).await, Some(Role::Member));
    }

    #[tokio::test]
    async fn provider_failure_leaves_memberships_alone() {
        let store = Arc::new(MemoryOrganizationStore::new());
        let user = User::new(3, "carol");
        let syncer = syncer(store.clone());
        syncer
            .sync_organizations(&user, &[UpstreamMembership::new("acme", "github", Role::Admin)])
            .await
            .unwrap();

        let err = syncer
            .sync_from_provider(&user, &UnreachableProvider)
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::IdentityProvider(_)));
        assert_eq!(store.memberships(3).await.unwrap().len(), 1);
    }
}
