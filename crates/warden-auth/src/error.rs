use thiserror::Error;
use warden_secrets::SecretError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("token expired")]
    TokenExpired,

    #[error("token '{id}' of '{subject}' has been revoked")]
    TokenRevoked { subject: String, id: String },

    #[error("token store error: {0}")]
    TokenStore(#[from] SecretError),

    #[error("malformed stored token at '{path}': {source}")]
    MalformedStoredToken {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
