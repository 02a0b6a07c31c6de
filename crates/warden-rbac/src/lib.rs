//! # warden-rbac
//!
//! Organization-scoped role-based access control:
//! - [`RoleBinder`] maps upstream group claims to a [`Role`](warden_core::Role)
//! - [`OrganizationSyncer`] reconciles memberships with the identity provider
//! - [`AccessEnforcer`] decides per request, delegating member permissions
//!   to a [`PolicyEngine`]
//!
//! Consistency: role lookups hit the [`RoleSource`] on every decision. Only
//! the [`RulePolicy`] rule set is cached, and it may lag its source by one
//! refresh interval.

pub mod binding;
pub mod enforcer;
pub mod error;
pub mod memory;
pub mod policy;
pub mod sync;

pub use binding::RoleBinder;
pub use enforcer::{AccessEnforcer, RoleSource};
pub use error::RbacError;
pub use memory::MemoryOrganizationStore;
pub use policy::{
    Effect, PolicyEngine, PolicyRule, PolicyRuleSource, RulePolicy, StaticPolicy,
    policy_from_config, wildcard_match,
};
pub use sync::{
    IdentityProvider, NoopEvents, OrganizationEvents, OrganizationStore, OrganizationSyncer,
    SyncReport,
};
