//! Cluster PKI issuance against the in-memory secret backend.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pretty_assertions::assert_eq;
use warden_pki::{
    ENCRYPTION_SECRET, ETCD_CA_CERT, FRONT_PROXY_CA_CERT, KUBERNETES_CA_CERT,
    KUBERNETES_CA_SIGNING_CERT, PkeSecreter, PkiError, PkiSettings, SA_KEY, SA_PUB,
    split_pem_chain, verify_chain,
};
use warden_secrets::{MemoryBackend, MountConfig, SecretBackend, SecretData, SecretError};

fn secreter(backend: &Arc<MemoryBackend>) -> PkeSecreter {
    PkeSecreter::new(backend.clone(), PkiSettings::default())
}

fn mounts_for(organization: u64, cluster: &str) -> Vec<String> {
    let base = format!("clusters/{organization}/{cluster}/pki");
    let mut mounts: Vec<String> = ["ca", "etcd", "front-proxy", "kubernetes"]
        .iter()
        .map(|name| format!("{base}/{name}"))
        .collect();
    mounts.sort();
    mounts
}

#[tokio::test]
async fn issues_verifiable_bundle() {
    let backend = Arc::new(MemoryBackend::new());
    let bundle = secreter(&backend)
        .generate_pke_secret(1, &["env:dev", "clusterID:alpha"])
        .await
        .unwrap();

    assert_eq!(bundle.len(), 10);
    for key in [KUBERNETES_CA_CERT, ETCD_CA_CERT, FRONT_PROXY_CA_CERT] {
        assert_eq!(split_pem_chain(&bundle[key]).unwrap().len(), 2, "{key}");
        verify_chain(&bundle[key]).unwrap();
    }
    assert_eq!(
        split_pem_chain(&bundle[KUBERNETES_CA_SIGNING_CERT])
            .unwrap()
            .len(),
        1
    );
    assert!(bundle[SA_PUB].contains("BEGIN PUBLIC KEY"));
    assert!(bundle[SA_KEY].contains("BEGIN RSA PRIVATE KEY"));
    assert_eq!(STANDARD.decode(&bundle[ENCRYPTION_SECRET]).unwrap().len(), 32);

    assert_eq!(backend.mounts().await, mounts_for(1, "alpha"));
}

#[tokio::test]
async fn intermediates_do_not_verify_against_other_roots() {
    let backend = Arc::new(MemoryBackend::new());
    let secreter = secreter(&backend);
    let a = secreter
        .generate_pke_secret(1, &["clusterID:a"])
        .await
        .unwrap();
    let b = secreter
        .generate_pke_secret(1, &["clusterID:b"])
        .await
        .unwrap();

    let foreign = format!(
        "{}\n{}",
        a[KUBERNETES_CA_SIGNING_CERT].trim_end(),
        b[KUBERNETES_CA_CERT]
            .split_inclusive("-----END CERTIFICATE-----")
            .nth(1)
            .unwrap()
            .trim()
    );
    assert!(matches!(
        verify_chain(&foreign),
        Err(PkiError::InvalidChain(_))
    ));
}

#[tokio::test]
async fn clusters_never_share_mounts() {
    let backend = Arc::new(MemoryBackend::new());
    let secreter = secreter(&backend);
    secreter
        .generate_pke_secret(1, &["clusterID:a"])
        .await
        .unwrap();
    secreter
        .generate_pke_secret(1, &["clusterID:b"])
        .await
        .unwrap();
    secreter
        .generate_pke_secret(2, &["clusterID:a"])
        .await
        .unwrap();

    let mut expected = [mounts_for(1, "a"), mounts_for(1, "b"), mounts_for(2, "a")].concat();
    expected.sort();
    assert_eq!(backend.mounts().await, expected);
}

#[tokio::test]
async fn missing_cluster_tag_makes_no_backend_calls() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_on("").await;
    let err = secreter(&backend)
        .generate_pke_secret(1, &["env:prod"])
        .await
        .unwrap_err();
    assert!(matches!(err, PkiError::MissingClusterTag));
    assert!(backend.mounts().await.is_empty());
}

#[tokio::test]
async fn failed_intermediate_removes_created_mounts() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_on("pki/etcd").await;
    let err = secreter(&backend)
        .generate_pke_secret(4, &["clusterID:broken"])
        .await
        .unwrap_err();

    match err {
        PkiError::Backend {
            organization_id,
            cluster_id,
            source: SecretError::Injected { path },
        } => {
            assert_eq!(organization_id, 4);
            assert_eq!(cluster_id, "broken");
            assert_eq!(path, "clusters/4/broken/pki/etcd");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(backend.mounts().await.is_empty());
}

#[tokio::test]
async fn failed_signing_removes_every_mount() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_on("root/sign-intermediate").await;
    let err = secreter(&backend)
        .generate_pke_secret(5, &["clusterID:c"])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PkiError::Backend {
            source: SecretError::Injected { .. },
            ..
        }
    ));
    assert!(!err.is_transient());
    assert!(backend.mounts().await.is_empty());
}

/// Delegates to a memory backend but can never unmount, and rejects CSR signing.
struct StuckBackend(MemoryBackend);

#[async_trait]
impl SecretBackend for StuckBackend {
    async fn write(&self, path: &str, data: SecretData) -> Result<Option<SecretData>, SecretError> {
        if path.ends_with("root/sign-intermediate") {
            return Err(SecretError::Http {
                path: path.to_string(),
                status: 503,
                body: "sealed".into(),
            });
        }
        self.0.write(path, data).await
    }

    async fn read(&self, path: &str) -> Result<Option<SecretData>, SecretError> {
        self.0.read(path).await
    }

    async fn list(&self, path: &str) -> Result<Vec<String>, SecretError> {
        self.0.list(path).await
    }

    async fn delete(&self, path: &str) -> Result<(), SecretError> {
        self.0.delete(path).await
    }

    async fn mount(&self, path: &str, config: &MountConfig) -> Result<(), SecretError> {
        self.0.mount(path, config).await
    }

    async fn unmount(&self, path: &str) -> Result<(), SecretError> {
        Err(SecretError::Timeout {
            path: path.to_string(),
        })
    }
}

#[tokio::test]
async fn cleanup_failure_does_not_mask_original_error() {
    let backend = Arc::new(StuckBackend(MemoryBackend::new()));
    let secreter = PkeSecreter::new(backend.clone(), PkiSettings::default());
    let err = secreter
        .generate_pke_secret(6, &["clusterID:orphan"])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PkiError::Backend {
            source: SecretError::Http { status: 503, .. },
            ..
        }
    ));
    assert!(err.is_transient());
    assert_eq!(
        backend.0.mounts().await,
        vec![
            "clusters/6/orphan/pki/ca".to_string(),
            "clusters/6/orphan/pki/kubernetes".to_string(),
        ]
    );
}

#[tokio::test]
async fn second_issuance_for_same_cluster_conflicts_without_damage() {
    let backend = Arc::new(MemoryBackend::new());
    let secreter = secreter(&backend);
    secreter
        .generate_pke_secret(1, &["clusterID:dup"])
        .await
        .unwrap();

    let err = secreter
        .generate_pke_secret(1, &["clusterID:dup"])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PkiError::Backend {
            source: SecretError::MountConflict { .. },
            ..
        }
    ));
    assert_eq!(backend.mounts().await, mounts_for(1, "dup"));
}

#[tokio::test]
async fn delete_removes_all_mounts_and_tolerates_failures() {
    let backend = Arc::new(MemoryBackend::new());
    let secreter = secreter(&backend);
    secreter
        .generate_pke_secret(1, &["clusterID:gone"])
        .await
        .unwrap();
    secreter
        .generate_pke_secret(1, &["clusterID:stuck"])
        .await
        .unwrap();

    secreter
        .delete_pke_secret(1, &["clusterID:gone"])
        .await
        .unwrap();
    assert_eq!(backend.mounts().await, mounts_for(1, "stuck"));

    backend.fail_on("stuck/pki/kubernetes").await;
    secreter
        .delete_pke_secret(1, &["clusterID:stuck"])
        .await
        .unwrap();
    assert_eq!(
        backend.mounts().await,
        vec!["clusters/1/stuck/pki/kubernetes".to_string()]
    );

    secreter
        .delete_pke_secret(9, &["clusterID:never-created"])
        .await
        .unwrap();
    assert!(matches!(
        secreter.delete_pke_secret(1, &["no-tag"]).await,
        Err(PkiError::MissingClusterTag)
    ));
}
