//! Secret backend configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_vault_address() -> String {
    String::from("http://127.0.0.1:8200")
}

const fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretsBackendKind {
    /// HashiCorp Vault over HTTP.
    #[default]
    Vault,
    /// In-process store with an emulated PKI engine (development and tests).
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultConfig {
    /// Vault server address.
    #[serde(default = "default_vault_address")]
    pub address: String,

    /// Vault token sent as `X-Vault-Token`.
    #[serde(default)]
    pub token: String,

    /// Optional Vault Enterprise namespace.
    #[serde(default)]
    pub namespace: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: default_vault_address(),
            token: String::new(),
            namespace: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl VaultConfig {
    pub fn is_configured(&self) -> bool {
        !self.address.is_empty() && !self.token.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SecretsConfig {
    #[serde(default)]
    pub backend: SecretsBackendKind,

    #[serde(default)]
    pub vault: VaultConfig,
}

impl SecretsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            SecretsBackendKind::Memory => Ok(()),
            SecretsBackendKind::Vault if !self.vault.is_configured() => {
                Err(ConfigError::NotConfigured {
                    section: "secrets.vault".into(),
                })
            }
            SecretsBackendKind::Vault if self.vault.timeout_secs == 0 => {
                Err(ConfigError::InvalidValue {
                    field: "secrets.vault.timeout_secs".into(),
                    reason: "must be greater than zero".into(),
                })
            }
            SecretsBackendKind::Vault => Ok(()),
        }
    }
}
