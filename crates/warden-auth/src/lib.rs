//! # warden-auth
//!
//! Scoped API tokens for Warden.
//!
//! Tokens are HS256 JWTs whose identifier (`jti`) is recorded in a
//! [`TokenStore`]. Verification needs both a valid signature and a stored
//! identifier, which makes otherwise stateless JWTs revocable.

pub mod claims;
pub mod clock;
pub mod cluster;
pub mod error;
pub mod generator;
pub mod manager;
pub mod store;

use std::sync::Arc;

use warden_config::{AuthConfig, TokenStoreKind};
use warden_secrets::SecretBackend;

pub use claims::{API_INVOKE_SCOPE, ScopedClaims};
pub use clock::{Clock, FixedClock, FixedIdGenerator, IdGenerator, SystemClock, UuidGenerator};
pub use cluster::{CLUSTER_TOKEN_TYPE, ClusterTokenGenerator};
pub use error::AuthError;
pub use generator::{NO_EXPIRATION, TokenGenerator};
pub use manager::{IssuedToken, TokenManager, TokenRequest, USER_TOKEN_TYPE};
pub use store::{BackendTokenStore, MemoryTokenStore, StoredToken, TokenStore};

/// Build the token store selected by `auth.token_store`.
#[must_use]
pub fn token_store_from_config(
    config: &AuthConfig,
    backend: Arc<dyn SecretBackend>,
) -> Arc<dyn TokenStore> {
    match config.token_store {
        TokenStoreKind::Backend => Arc::new(BackendTokenStore::new(
            backend,
            &config.token_store_prefix,
        )),
        TokenStoreKind::Memory => Arc::new(MemoryTokenStore::new()),
    }
}

/// Build a [`TokenManager`] from the `auth` configuration section.
///
/// # Errors
///
/// Returns `AuthError::InvalidSigningKey` if the configured key is too short.
pub fn manager_from_config(
    config: &AuthConfig,
    backend: Arc<dyn SecretBackend>,
) -> Result<TokenManager, AuthError> {
    let generator = TokenGenerator::from_config(config)?;
    Ok(TokenManager::new(
        generator,
        token_store_from_config(config, backend),
    ))
}
