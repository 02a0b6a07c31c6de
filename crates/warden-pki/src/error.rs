use thiserror::Error;
use warden_secrets::SecretError;

#[derive(Debug, Error)]
pub enum PkiError {
    #[error("missing 'clusterID:' tag")]
    MissingClusterTag,

    #[error("PKI issuance for organization {organization_id} cluster '{cluster_id}' failed: {source}")]
    Backend {
        organization_id: u64,
        cluster_id: String,
        #[source]
        source: SecretError,
    },

    #[error("failed to generate service account key: {0}")]
    KeyGeneration(String),

    #[error("failed to generate encryption secret: {0}")]
    Random(String),

    #[error("invalid certificate chain: {0}")]
    InvalidChain(String),
}

impl PkiError {
    /// Whether retrying the whole issuance later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend { source, .. } if source.is_transient())
    }
}
