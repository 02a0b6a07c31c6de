//! Cluster PKI issuance configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_ttl() -> String {
    String::from("43800h")
}

fn default_mount_prefix() -> String {
    String::from("clusters")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PkiConfig {
    /// Lease TTL of the root CA mount and certificate.
    #[serde(default = "default_ttl")]
    pub root_ttl: String,

    /// TTL of the signed intermediate CA certificates.
    #[serde(default = "default_ttl")]
    pub intermediate_ttl: String,

    /// First path segment of every cluster PKI mount.
    #[serde(default = "default_mount_prefix")]
    pub mount_prefix: String,
}

impl Default for PkiConfig {
    fn default() -> Self {
        Self {
            root_ttl: default_ttl(),
            intermediate_ttl: default_ttl(),
            mount_prefix: default_mount_prefix(),
        }
    }
}

impl PkiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mount_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "pki.mount_prefix".into(),
                reason: "must not be empty".into(),
            });
        }
        for (field, ttl) in [
            ("pki.root_ttl", &self.root_ttl),
            ("pki.intermediate_ttl", &self.intermediate_ttl),
        ] {
            if ttl.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    reason: "must not be empty".into(),
                });
            }
        }
        Ok(())
    }
}
