//! In-process organization and membership data source.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use warden_core::{Membership, Organization, Role};

use crate::enforcer::RoleSource;
use crate::error::RbacError;
use crate::sync::OrganizationStore;

#[derive(Debug, Default)]
struct State {
    organizations: BTreeMap<u64, Organization>,
    /// `(organization_id, user_id) → role`
    memberships: BTreeMap<(u64, u64), Role>,
    next_id: u64,
}

/// Organization store and role source kept in memory.
#[derive(Debug, Default)]
pub struct MemoryOrganizationStore {
    state: RwLock<State>,
}

impl MemoryOrganizationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn organization(&self, name: &str) -> Option<Organization> {
        self.state
            .read()
            .await
            .organizations
            .values()
            .find(|organization| organization.name == name)
            .cloned()
    }

    pub async fn organizations(&self) -> Vec<Organization> {
        self.state
            .read()
            .await
            .organizations
            .values()
            .cloned()
            .collect()
    }

    pub async fn role_of(&self, organization_id: u64, user_id: u64) -> Option<Role> {
        self.state
            .read()
            .await
            .memberships
            .get(&(organization_id, user_id))
            .copied()
    }
}

fn not_a_member(organization_id: u64, user_id: u64) -> RbacError {
    RbacError::Store(format!(
        "user {user_id} is not a member of organization {organization_id}"
    ))
}

#[async_trait]
impl OrganizationStore for MemoryOrganizationStore {
    async fn ensure_organization(
        &self,
        name: &str,
        provider: &str,
    ) -> Result<(Organization, bool), RbacError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .organizations
            .values()
            .find(|organization| organization.name == name)
        {
            return Ok((existing.clone(), false));
        }

        state.next_id += 1;
        let organization = Organization {
            id: state.next_id,
            name: name.to_string(),
            provider: provider.to_string(),
        };
        state
            .organizations
            .insert(organization.id, organization.clone());
        Ok((organization, true))
    }

    async fn memberships(&self, user_id: u64) -> Result<Vec<Membership>, RbacError> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .iter()
            .filter(|((_, member), _)| *member == user_id)
            .filter_map(|((organization_id, _), role)| {
                state
                    .organizations
                    .get(organization_id)
                    .map(|organization| Membership {
                        organization: organization.clone(),
                        role: *role,
                    })
            })
            .collect())
    }

    async fn add_member(
        &self,
        organization_id: u64,
        user_id: u64,
        role: Role,
    ) -> Result<(), RbacError> {
        let mut state = self.state.write().await;
        if !state.organizations.contains_key(&organization_id) {
            return Err(RbacError::Store(format!(
                "organization {organization_id} does not exist"
            )));
        }
        if state.memberships.contains_key(&(organization_id, user_id)) {
            return Err(RbacError::Store(format!(
                "user {user_id} is already a member of organization {organization_id}"
            )));
        }
        state.memberships.insert((organization_id, user_id), role);
        Ok(())
    }

    async fn update_role(
        &self,
        organization_id: u64,
        user_id: u64,
        role: Role,
    ) -> Result<(), RbacError> {
        let mut state = self.state.write().await;
        let current = state
            .memberships
            .get_mut(&(organization_id, user_id))
            .ok_or_else(|| not_a_member(organization_id, user_id))?;
        *current = role;
        Ok(())
    }

    async fn remove_member(&self, organization_id: u64, user_id: u64) -> Result<(), RbacError> {
        self.state
            .write()
            .await
            .memberships
            .remove(&(organization_id, user_id))
            .map(|_| ())
            .ok_or_else(|| not_a_member(organization_id, user_id))
    }
}

#[async_trait]
impl RoleSource for MemoryOrganizationStore {
    async fn find_user_role(
        &self,
        organization_id: u64,
        user_id: u64,
    ) -> Result<Option<Role>, RbacError> {
        Ok(self.role_of(organization_id, user_id).await)
    }
}
