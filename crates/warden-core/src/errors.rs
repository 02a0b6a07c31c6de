//! Cross-cutting error types for Warden.
//!
//! Domain-specific errors (e.g., `SecretError`, `PkiError`) are defined in
//! their respective crates.

use thiserror::Error;

/// Errors that can be raised while handling core identity types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A role name outside the known role set.
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    /// A virtual user login claims a cluster scope but has no numeric organization segment.
    #[error("malformed virtual user login '{0}': expected clusters/<organization id>[/<cluster>]")]
    MalformedVirtualLogin(String),
}
