//! Token issuance configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Minimum length of the HMAC signing key.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

fn default_issuer() -> String {
    String::from("https://warden.local/")
}

fn default_audience() -> String {
    String::from("https://warden.local/")
}

fn default_token_store_prefix() -> String {
    String::from("warden/tokens")
}

/// Where issued token identifiers are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    /// One secret path per token in the configured secret backend.
    #[default]
    Backend,
    /// Process-local map, lost on restart.
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// `iss` claim of issued tokens.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// `aud` claim of issued tokens.
    #[serde(default = "default_audience")]
    pub audience: String,

    /// HMAC key used to sign tokens.
    #[serde(default)]
    pub signing_key: String,

    /// Secret backend path under which tokens are stored.
    #[serde(default = "default_token_store_prefix")]
    pub token_store_prefix: String,

    #[serde(default)]
    pub token_store: TokenStoreKind,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            audience: default_audience(),
            signing_key: String::new(),
            token_store_prefix: default_token_store_prefix(),
            token_store: TokenStoreKind::default(),
        }
    }
}

impl AuthConfig {
    /// Check if a signing key has been provided.
    pub fn is_configured(&self) -> bool {
        !self.signing_key.is_empty()
    }

    /// Fail fast on a missing or short signing key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_configured() {
            return Err(ConfigError::NotConfigured {
                section: "auth".into(),
            });
        }
        if self.signing_key.chars().count() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigError::InvalidValue {
                field: "auth.signing_key".into(),
                reason: format!("must be at least {MIN_SIGNING_KEY_LEN} characters"),
            });
        }
        if self.token_store_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "auth.token_store_prefix".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}
