use thiserror::Error;

#[derive(Debug, Error)]
pub enum RbacError {
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    #[error("invalid binding pattern for role '{role}': {source}")]
    InvalidPattern {
        role: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid policy rule: {0}")]
    InvalidRule(String),

    /// A virtual login that claims a cluster scope but cannot be parsed.
    #[error("malformed principal '{0}'")]
    MalformedPrincipal(String),

    #[error("organization store error: {0}")]
    Store(String),

    /// Raised by [`IdentityProvider`](crate::IdentityProvider) implementations.
    #[error("identity provider error: {0}")]
    IdentityProvider(String),
}
