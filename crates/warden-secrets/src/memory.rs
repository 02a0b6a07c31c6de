//! In-process secret backend.
//!
//! Holds key/value secrets in a map and emulates the PKI secrets engine on
//! every mount of kind `pki`. All state is wrapped in `RwLock`s so the
//! backend can be shared across tasks behind an `Arc`.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::pki_engine::{self, CaMaterial};
use crate::{MountConfig, SecretBackend, SecretData, SecretError};

const PKI_KIND: &str = "pki";

#[derive(Debug)]
struct Mount {
    config: MountConfig,
    ca: Option<CaMaterial>,
}

#[derive(Debug, Default)]
struct State {
    kv: BTreeMap<String, SecretData>,
    mounts: BTreeMap<String, Mount>,
}

impl State {
    /// Find the PKI mount owning `path` and the endpoint below it.
    fn pki_endpoint<'a>(&self, path: &'a str) -> Option<(String, &'a str)> {
        self.mounts
            .iter()
            .filter(|(_, mount)| mount.config.kind == PKI_KIND)
            .filter_map(|(mount_path, _)| {
                path.strip_prefix(mount_path.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
                    .map(|endpoint| (mount_path.clone(), endpoint))
            })
            .max_by_key(|(mount_path, _)| mount_path.len())
    }
}

/// Secret backend kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
    failures: RwLock<Vec<String>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call whose path contains `fragment` fail.
    pub async fn fail_on(&self, fragment: impl Into<String>) {
        self.failures.write().await.push(fragment.into());
    }

    /// Remove all injected failures.
    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    /// Paths of all current mounts, sorted.
    pub async fn mounts(&self) -> Vec<String> {
        self.state.read().await.mounts.keys().cloned().collect()
    }

    async fn check_failure(&self, path: &str) -> Result<(), SecretError> {
        let failures = self.failures.read().await;
        if failures.iter().any(|fragment| path.contains(fragment.as_str())) {
            return Err(SecretError::Injected {
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn required_str<'a>(
    path: &str,
    data: &'a SecretData,
    field: &'static str,
) -> Result<&'a str, SecretError> {
    data.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| SecretError::MissingField {
            path: path.to_string(),
            field,
        })
}

fn into_data(value: Value) -> Option<SecretData> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn pki_error(path: &str) -> impl FnOnce(String) -> SecretError + '_ {
    move |reason| SecretError::Pki {
        path: path.to_string(),
        reason,
    }
}

#[async_trait]
impl SecretBackend for MemoryBackend {
    async fn write(&self, path: &str, data: SecretData) -> Result<Option<SecretData>, SecretError> {
        let path = normalize(path);
        self.check_failure(&path).await?;
        let mut state = self.state.write().await;

        let Some((mount_path, endpoint)) = state.pki_endpoint(&path) else {
            state.kv.insert(path, data);
            return Ok(None);
        };

        match endpoint {
            "root/generate/internal" => {
                let common_name = required_str(&path, &data, "common_name")?;
                let ca = pki_engine::generate_root(common_name).map_err(pki_error(&path))?;
                let cert_pem = ca.cert_pem.clone();
                if let Some(mount) = state.mounts.get_mut(&mount_path) {
                    mount.ca = Some(ca);
                }
                Ok(into_data(json!({
                    "certificate": cert_pem,
                    "issuing_ca": cert_pem,
                })))
            }
            "intermediate/generate/exported" => {
                let common_name = required_str(&path, &data, "common_name")?;
                let request = pki_engine::generate_intermediate_request(common_name)
                    .map_err(pki_error(&path))?;
                Ok(into_data(json!({
                    "csr": request.csr_pem,
                    "private_key": request.key_pem,
                    "private_key_type": "ec",
                })))
            }
            "root/sign-intermediate" => {
                let csr = required_str(&path, &data, "csr")?;
                let ca = state
                    .mounts
                    .get(&mount_path)
                    .and_then(|mount| mount.ca.as_ref())
                    .ok_or_else(|| SecretError::Pki {
                        path: path.clone(),
                        reason: "mount has no root CA".into(),
                    })?;
                let certificate =
                    pki_engine::sign_intermediate(ca, csr).map_err(pki_error(&path))?;
                Ok(into_data(json!({
                    "certificate": certificate,
                    "issuing_ca": ca.cert_pem,
                })))
            }
            _ => Err(SecretError::Unsupported { path }),
        }
    }

    async fn read(&self, path: &str) -> Result<Option<SecretData>, SecretError> {
        let path = normalize(path);
        self.check_failure(&path).await?;
        let state = self.state.read().await;

        if let Some((mount_path, endpoint)) = state.pki_endpoint(&path) {
            if endpoint != "cert/ca" {
                return Err(SecretError::Unsupported { path });
            }
            return Ok(state
                .mounts
                .get(&mount_path)
                .and_then(|mount| mount.ca.as_ref())
                .and_then(|ca| into_data(json!({ "certificate": ca.cert_pem }))));
        }

        Ok(state.kv.get(&path).cloned())
    }

    async fn list(&self, path: &str) -> Result<Vec<String>, SecretError> {
        let path = normalize(path);
        self.check_failure(&path).await?;
        let state = self.state.read().await;
        let prefix = format!("{path}/");

        let keys: BTreeSet<String> = state
            .kv
            .keys()
            .filter_map(|key| key.strip_prefix(prefix.as_str()))
            .map(|rest| match rest.split_once('/') {
                Some((child, _)) => format!("{child}/"),
                None => rest.to_string(),
            })
            .collect();
        Ok(keys.into_iter().collect())
    }

    async fn delete(&self, path: &str) -> Result<(), SecretError> {
        let path = normalize(path);
        self.check_failure(&path).await?;
        self.state.write().await.kv.remove(&path);
        Ok(())
    }

    async fn mount(&self, path: &str, config: &MountConfig) -> Result<(), SecretError> {
        let path = normalize(path);
        self.check_failure(&path).await?;
        let mut state = self.state.write().await;
        if state.mounts.contains_key(&path) {
            return Err(SecretError::MountConflict { path });
        }
        state.mounts.insert(
            path,
            Mount {
                config: config.clone(),
                ca: None,
            },
        );
        Ok(())
    }

    async fn unmount(&self, path: &str) -> Result<(), SecretError> {
        let path = normalize(path);
        self.check_failure(&path).await?;
        let mut state = self.state.write().await;
        state.mounts.remove(&path);
        let prefix = format!("{path}/");
        state.kv.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }
}
