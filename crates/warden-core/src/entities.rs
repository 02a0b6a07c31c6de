//! Organization and membership entities.

use serde::{Deserialize, Serialize};

use crate::enums::Role;

/// A tenant organization, mirrored from an upstream identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Organization {
    pub id: u64,
    pub name: String,
    /// Upstream identity provider the organization was first seen on (e.g. `github`).
    pub provider: String,
}

/// A user's membership in one organization (the `UserOrganization` relation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub organization: Organization,
    pub role: Role,
}

/// An organization as reported by the upstream identity provider, with the
/// group claims the user holds inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamOrganization {
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Desired membership after role binding: the input to organization sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamMembership {
    pub name: String,
    pub provider: String,
    pub role: Role,
}

impl UpstreamMembership {
    #[must_use]
    pub fn new(name: impl Into<String>, provider: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            role,
        }
    }
}
