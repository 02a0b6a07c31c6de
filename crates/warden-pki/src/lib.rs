//! # warden-pki
//!
//! Issues the certificate hierarchy a new cluster bootstraps its control
//! plane from, using the PKI engine of a [`SecretBackend`](warden_secrets::SecretBackend).
//!
//! Mount layout per cluster, below `{mount_prefix}/{organization}/{cluster}/pki`:
//!
//! ```text
//! ca            root CA (key never leaves the backend)
//! kubernetes    intermediate CA, signed by ca
//! etcd          intermediate CA, signed by ca
//! front-proxy   intermediate CA, signed by ca
//! ```
//!
//! Each intermediate lives on its own mount because a PKI mount cannot sign
//! an intermediate under the root it hosts.

pub mod chain;
pub mod error;
pub mod keys;
pub mod secreter;

pub use chain::{split_pem_chain, verify_chain};
pub use error::PkiError;
pub use secreter::{
    ENCRYPTION_SECRET, ETCD_CA_CERT, ETCD_CA_KEY, FRONT_PROXY_CA_CERT, FRONT_PROXY_CA_KEY,
    KUBERNETES_CA_CERT, KUBERNETES_CA_KEY, KUBERNETES_CA_SIGNING_CERT, PkeSecreter, PkiSettings,
    SA_KEY, SA_PUB, cluster_id_from_tags,
};
