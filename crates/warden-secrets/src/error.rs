use thiserror::Error;

/// Errors raised by a [`crate::SecretBackend`].
///
/// Every variant carries the backend path the failing call addressed.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("request to '{path}' timed out")]
    Timeout { path: String },

    #[error("request to '{path}' failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("'{path}' returned HTTP {status}: {body}")]
    Http {
        path: String,
        status: u16,
        body: String,
    },

    #[error("invalid response from '{path}': {reason}")]
    InvalidResponse { path: String, reason: String },

    #[error("a secrets engine is already mounted at '{path}'")]
    MountConflict { path: String },

    #[error("operation not supported at '{path}'")]
    Unsupported { path: String },

    #[error("PKI operation at '{path}' failed: {reason}")]
    Pki { path: String, reason: String },

    #[error("missing field '{field}' in request to '{path}'")]
    MissingField { path: String, field: &'static str },

    #[error("injected failure at '{path}'")]
    Injected { path: String },

    #[error("invalid backend configuration: {0}")]
    Configuration(String),
}

impl SecretError {
    /// Whether retrying the same call later may succeed.
    ///
    /// Timeouts, connection failures and server-side errors qualify; a
    /// rejected request or a mount conflict does not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Request { source, .. } => source.is_connect() || source.is_timeout(),
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The backend path the failing call addressed, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Timeout { path }
            | Self::Request { path, .. }
            | Self::Http { path, .. }
            | Self::InvalidResponse { path, .. }
            | Self::MountConflict { path }
            | Self::Unsupported { path }
            | Self::Pki { path, .. }
            | Self::MissingField { path, .. }
            | Self::Injected { path } => Some(path),
            Self::Configuration(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = SecretError::Http {
            path: "sys/mounts/x".into(),
            status: 503,
            body: "sealed".into(),
        };
        assert!(err.is_transient());
        assert_eq!(err.path(), Some("sys/mounts/x"));
    }

    #[test]
    fn client_errors_are_not_transient() {
        let err = SecretError::Http {
            path: "secret/x".into(),
            status: 403,
            body: "permission denied".into(),
        };
        assert!(!err.is_transient());
        assert!(!SecretError::MountConflict { path: "a".into() }.is_transient());
        assert!(SecretError::Timeout { path: "a".into() }.is_transient());
    }
}
