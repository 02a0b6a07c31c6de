//! # warden-secrets
//!
//! Narrow capability interface over a remote secret store with a PKI engine,
//! plus two implementations:
//! - [`VaultBackend`]: HashiCorp Vault over its HTTP API
//! - [`MemoryBackend`]: an in-process store that emulates the PKI endpoints,
//!   for development and tests
//!
//! PKI endpoint conventions used by callers (relative to a PKI mount):
//! `root/generate/internal`, `cert/ca`, `intermediate/generate/exported`,
//! `root/sign-intermediate`.

mod error;
mod memory;
mod pki_engine;
mod vault;

pub use error::SecretError;
pub use memory::MemoryBackend;
pub use vault::VaultBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Key/value payload of a secret or an endpoint response.
pub type SecretData = serde_json::Map<String, serde_json::Value>;

/// Engine type and lease settings for a new mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Secrets engine type, e.g. `pki`.
    pub kind: String,
    pub max_lease_ttl: String,
    pub default_lease_ttl: String,
}

impl MountConfig {
    /// A PKI engine mount whose leases all share one TTL.
    #[must_use]
    pub fn pki(ttl: impl Into<String>) -> Self {
        let ttl = ttl.into();
        Self {
            kind: "pki".to_string(),
            max_lease_ttl: ttl.clone(),
            default_lease_ttl: ttl,
        }
    }
}

/// Capability interface over a remote secret/PKI store.
///
/// Paths are relative and never start with `/`.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Write `data` at `path`. Endpoints that answer with data (PKI) return it.
    async fn write(&self, path: &str, data: SecretData) -> Result<Option<SecretData>, SecretError>;

    /// Read the secret or endpoint at `path`; `None` when nothing is there.
    async fn read(&self, path: &str) -> Result<Option<SecretData>, SecretError>;

    /// List child keys under `path`. Sub-trees are suffixed with `/`.
    async fn list(&self, path: &str) -> Result<Vec<String>, SecretError>;

    async fn delete(&self, path: &str) -> Result<(), SecretError>;

    async fn mount(&self, path: &str, config: &MountConfig) -> Result<(), SecretError>;

    async fn unmount(&self, path: &str) -> Result<(), SecretError>;
}

/// Pull a required string field out of an endpoint response.
///
/// # Errors
///
/// Returns `SecretError::InvalidResponse` when the response is empty or the
/// field is missing or not a string.
pub fn string_field(
    path: &str,
    data: Option<&SecretData>,
    field: &'static str,
) -> Result<String, SecretError> {
    data.and_then(|d| d.get(field))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SecretError::InvalidResponse {
            path: path.to_string(),
            reason: format!("missing string field '{field}'"),
        })
}
