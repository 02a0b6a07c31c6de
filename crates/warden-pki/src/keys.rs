//! Locally generated bootstrap material.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::PkiError;

const SERVICE_ACCOUNT_KEY_BITS: usize = 2048;
const ENCRYPTION_SECRET_LEN: usize = 32;

/// PEM-encoded service-account signing keypair.
pub struct ServiceAccountKeys {
    /// PKIX (`PUBLIC KEY`) encoding.
    pub public_pem: String,
    /// PKCS#1 (`RSA PRIVATE KEY`) encoding.
    pub private_pem: String,
}

/// Generate the RSA keypair the cluster signs service-account tokens with.
///
/// # Errors
///
/// Returns `PkiError::KeyGeneration` if key generation or encoding fails.
pub fn generate_service_account_keys() -> Result<ServiceAccountKeys, PkiError> {
    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), SERVICE_ACCOUNT_KEY_BITS)
        .map_err(|e| PkiError::KeyGeneration(e.to_string()))?;
    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| PkiError::KeyGeneration(e.to_string()))?;
    let public_pem = RsaPublicKey::from(&private_key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| PkiError::KeyGeneration(e.to_string()))?;

    Ok(ServiceAccountKeys {
        public_pem,
        private_pem: private_pem.to_string(),
    })
}

/// 32 random bytes, base64 encoded, for encrypting secrets at rest.
///
/// # Errors
///
/// Returns `PkiError::Random` if the OS random source fails.
pub fn generate_encryption_secret() -> Result<String, PkiError> {
    let mut secret = [0u8; ENCRYPTION_SECRET_LEN];
    getrandom::fill(&mut secret).map_err(|e| PkiError::Random(e.to_string()))?;
    Ok(STANDARD.encode(secret))
}
