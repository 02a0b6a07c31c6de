//! Per-cluster certificate hierarchy issuance.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use warden_config::PkiConfig;
use warden_secrets::{MountConfig, SecretBackend, SecretData, SecretError, string_field};

use crate::error::PkiError;
use crate::keys::{generate_encryption_secret, generate_service_account_keys};

pub const KUBERNETES_CA_KEY: &str = "KubernetesCAKey";
pub const KUBERNETES_CA_CERT: &str = "KubernetesCACert";
pub const KUBERNETES_CA_SIGNING_CERT: &str = "KubernetesCASigningCert";
pub const ETCD_CA_KEY: &str = "EtcdCAKey";
pub const ETCD_CA_CERT: &str = "EtcdCACert";
pub const FRONT_PROXY_CA_KEY: &str = "FrontProxyCAKey";
pub const FRONT_PROXY_CA_CERT: &str = "FrontProxyCACert";
pub const SA_PUB: &str = "SAPub";
pub const SA_KEY: &str = "SAKey";
pub const ENCRYPTION_SECRET: &str = "EncryptionSecret";

const CLUSTER_ID_TAG: &str = "clusterID:";

/// An intermediate CA issued from its own mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purpose {
    Kubernetes,
    Etcd,
    FrontProxy,
}

impl Purpose {
    const ALL: [Self; 3] = [Self::Kubernetes, Self::Etcd, Self::FrontProxy];

    const fn mount_name(self) -> &'static str {
        match self {
            Self::Kubernetes => "kubernetes",
            Self::Etcd => "etcd",
            Self::FrontProxy => "front-proxy",
        }
    }

    const fn key_name(self) -> &'static str {
        match self {
            Self::Kubernetes => KUBERNETES_CA_KEY,
            Self::Etcd => ETCD_CA_KEY,
            Self::FrontProxy => FRONT_PROXY_CA_KEY,
        }
    }

    const fn cert_name(self) -> &'static str {
        match self {
            Self::Kubernetes => KUBERNETES_CA_CERT,
            Self::Etcd => ETCD_CA_CERT,
            Self::FrontProxy => FRONT_PROXY_CA_CERT,
        }
    }
}

/// The value of the first non-empty `clusterID:<id>` tag.
#[must_use]
pub fn cluster_id_from_tags<S: AsRef<str>>(tags: &[S]) -> Option<&str> {
    tags.iter()
        .filter_map(|tag| tag.as_ref().strip_prefix(CLUSTER_ID_TAG))
        .find(|id| !id.is_empty())
}

/// Mount layout and lease TTLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkiSettings {
    pub mount_prefix: String,
    pub root_ttl: String,
    pub intermediate_ttl: String,
}

impl Default for PkiSettings {
    fn default() -> Self {
        Self::from_config(&PkiConfig::default())
    }
}

impl PkiSettings {
    #[must_use]
    pub fn from_config(config: &PkiConfig) -> Self {
        Self {
            mount_prefix: config.mount_prefix.trim_matches('/').to_string(),
            root_ttl: config.root_ttl.clone(),
            intermediate_ttl: config.intermediate_ttl.clone(),
        }
    }

    /// Base path shared by all mounts of one cluster.
    #[must_use]
    pub fn cluster_path(&self, organization_id: u64, cluster_id: &str) -> String {
        format!("{}/{organization_id}/{cluster_id}/pki", self.mount_prefix)
    }
}

/// Issues and tears down the PKI bundle of a cluster.
///
/// Calls for the same `(organization, cluster)` must not overlap: mount
/// collisions are not detected in advance.
pub struct PkeSecreter {
    backend: Arc<dyn SecretBackend>,
    settings: PkiSettings,
}

struct Scope<'a> {
    organization_id: u64,
    cluster_id: &'a str,
    base: String,
}

impl Scope<'_> {
    fn root_mount(&self) -> String {
        format!("{}/ca", self.base)
    }

    fn mount(&self, purpose: Purpose) -> String {
        format!("{}/{}", self.base, purpose.mount_name())
    }

    fn error(&self, source: SecretError) -> PkiError {
        PkiError::Backend {
            organization_id: self.organization_id,
            cluster_id: self.cluster_id.to_string(),
            source,
        }
    }
}

fn payload(value: serde_json::Value) -> SecretData {
    match value {
        serde_json::Value::Object(map) => map,
        _ => SecretData::new(),
    }
}

impl PkeSecreter {
    #[must_use]
    pub fn new(backend: Arc<dyn SecretBackend>, settings: PkiSettings) -> Self {
        Self { backend, settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &PkiSettings {
        &self.settings
    }

    fn scope<'a, S: AsRef<str>>(
        &self,
        organization_id: u64,
        tags: &'a [S],
    ) -> Result<Scope<'a>, PkiError> {
        let cluster_id = cluster_id_from_tags(tags).ok_or(PkiError::MissingClusterTag)?;
        Ok(Scope {
            organization_id,
            cluster_id,
            base: self.settings.cluster_path(organization_id, cluster_id),
        })
    }

    /// Issue a root CA, three intermediate CAs, a service-account keypair and
    /// an encryption secret for the cluster named by the `clusterID:` tag.
    ///
    /// Each `*CACert` value is the intermediate followed by the root.
    /// If anything fails after the root mount exists, every mount created by
    /// this call is removed again (root last) before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `PkiError::MissingClusterTag` before any backend call, or the
    /// first backend or key generation error.
    pub async fn generate_pke_secret<S: AsRef<str>>(
        &self,
        organization_id: u64,
        tags: &[S],
    ) -> Result<BTreeMap<String, String>, PkiError> {
        let scope = self.scope(organization_id, tags)?;
        let root_mount = scope.root_mount();
        self.backend
            .mount(&root_mount, &MountConfig::pki(&self.settings.root_ttl))
            .await
            .map_err(|e| scope.error(e))?;

        let mut mounted = vec![root_mount];
        match self.issue(&scope, &mut mounted).await {
            Ok(bundle) => Ok(bundle),
            Err(error) => {
                tracing::warn!(
                    %error,
                    organization_id,
                    cluster_id = scope.cluster_id,
                    "PKI issuance failed; removing created mounts"
                );
                self.unmount_all(mounted.iter().rev()).await;
                Err(error)
            }
        }
    }

    async fn issue(
        &self,
        scope: &Scope<'_>,
        mounted: &mut Vec<String>,
    ) -> Result<BTreeMap<String, String>, PkiError> {
        let root_mount = scope.root_mount();
        let root_cert = self
            .generate_root(&root_mount, scope.cluster_id)
            .await
            .map_err(|e| scope.error(e))?;

        let mut bundle = BTreeMap::new();
        for purpose in Purpose::ALL {
            let mount = scope.mount(purpose);
            self.backend
                .mount(&mount, &MountConfig::pki(&self.settings.intermediate_ttl))
                .await
                .map_err(|e| scope.error(e))?;
            mounted.push(mount.clone());

            let (key, cert) = self
                .generate_intermediate(&mount, &root_mount, purpose)
                .await
                .map_err(|e| scope.error(e))?;
            if purpose == Purpose::Kubernetes {
                bundle.insert(KUBERNETES_CA_SIGNING_CERT.to_string(), cert.clone());
            }
            bundle.insert(purpose.key_name().to_string(), key);
            bundle.insert(
                purpose.cert_name().to_string(),
                format!("{}\n{root_cert}", cert.trim_end()),
            );
        }

        let service_account = generate_service_account_keys()?;
        bundle.insert(SA_PUB.to_string(), service_account.public_pem);
        bundle.insert(SA_KEY.to_string(), service_account.private_pem);
        bundle.insert(ENCRYPTION_SECRET.to_string(), generate_encryption_secret()?);

        tracing::debug!(
            organization_id = scope.organization_id,
            cluster_id = scope.cluster_id,
            "issued cluster PKI"
        );
        Ok(bundle)
    }

    /// Generate the internal root CA and read its certificate back.
    async fn generate_root(&self, mount: &str, cluster_id: &str) -> Result<String, SecretError> {
        let path = format!("{mount}/root/generate/internal");
        self.backend
            .write(
                &path,
                payload(json!({
                    "common_name": format!("{cluster_id}-root-ca"),
                    "ttl": self.settings.root_ttl,
                })),
            )
            .await?;

        let path = format!("{mount}/cert/ca");
        let response = self.backend.read(&path).await?;
        string_field(&path, response.as_ref(), "certificate")
    }

    /// Create an intermediate CSR on `mount` and sign it with the root mount.
    /// Returns the exported private key and the signed certificate.
    async fn generate_intermediate(
        &self,
        mount: &str,
        root_mount: &str,
        purpose: Purpose,
    ) -> Result<(String, String), SecretError> {
        let common_name = format!("{}-ca", purpose.mount_name());

        let path = format!("{mount}/intermediate/generate/exported");
        let response = self
            .backend
            .write(&path, payload(json!({ "common_name": common_name })))
            .await?;
        let csr = string_field(&path, response.as_ref(), "csr")?;
        let private_key = string_field(&path, response.as_ref(), "private_key")?;

        let path = format!("{root_mount}/root/sign-intermediate");
        let response = self
            .backend
            .write(
                &path,
                payload(json!({
                    "csr": csr,
                    "common_name": common_name,
                    "format": "pem",
                    "ttl": self.settings.intermediate_ttl,
                })),
            )
            .await?;
        let certificate = string_field(&path, response.as_ref(), "certificate")?;
        Ok((private_key, certificate))
    }

    /// Unmount the cluster's four PKI mounts, intermediates first.
    ///
    /// Unmount failures are logged and never returned, so teardown of a
    /// partially issued cluster always runs to the end.
    ///
    /// # Errors
    ///
    /// Returns `PkiError::MissingClusterTag` if `tags` names no cluster.
    pub async fn delete_pke_secret<S: AsRef<str>>(
        &self,
        organization_id: u64,
        tags: &[S],
    ) -> Result<(), PkiError> {
        let scope = self.scope(organization_id, tags)?;
        let mut mounts: Vec<String> = Purpose::ALL
            .into_iter()
            .map(|purpose| scope.mount(purpose))
            .collect();
        mounts.push(scope.root_mount());
        self.unmount_all(mounts.iter()).await;
        Ok(())
    }

    async fn unmount_all<'a>(&self, mounts: impl Iterator<Item = &'a String>) {
        for mount in mounts {
            if let Err(error) = self.backend.unmount(mount).await {
                tracing::warn!(%error, path = %mount, "failed to unmount PKI engine");
            }
        }
    }
}
