//! # warden-core
//!
//! Core types shared across all Warden crates:
//! - Identity types (`User`, and the typed `Principal` resolved from it)
//! - Organization and membership entities
//! - The totally ordered `Role` set
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod identity;

pub use entities::{Membership, Organization, UpstreamMembership, UpstreamOrganization};
pub use enums::Role;
pub use errors::CoreError;
pub use identity::{CLUSTER_LOGIN_PREFIX, Principal, User};
