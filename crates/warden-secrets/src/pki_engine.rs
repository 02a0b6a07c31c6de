//! Certificate authority operations backing the in-memory PKI endpoints.

use rcgen::{
    BasicConstraints, CertificateParams, CertificateSigningRequestParams, DistinguishedName,
    DnType, DnValue, IsCa, Issuer, KeyPair, KeyUsagePurpose,
};

/// Key and certificate of a CA hosted by one PKI mount.
#[derive(Debug, Clone)]
pub(crate) struct CaMaterial {
    pub cert_pem: String,
    pub key_pem: String,
}

/// A freshly generated CSR and the private key it was made from.
pub(crate) struct ExportedRequest {
    pub csr_pem: String,
    pub key_pem: String,
}

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(
        DnType::CommonName,
        DnValue::Utf8String(common_name.to_string()),
    );
    dn
}

fn ca_key_usages() -> Vec<KeyUsagePurpose> {
    vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ]
}

/// Generate a self-signed root CA whose key never leaves the mount.
pub(crate) fn generate_root(common_name: &str) -> Result<CaMaterial, String> {
    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name(common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = ca_key_usages();

    let key_pair =
        KeyPair::generate().map_err(|e| format!("failed to generate root key: {e}"))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| format!("failed to self-sign root: {e}"))?;

    Ok(CaMaterial {
        cert_pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
    })
}

/// Generate an intermediate CA key pair and a CSR for it, exporting the key.
pub(crate) fn generate_intermediate_request(common_name: &str) -> Result<ExportedRequest, String> {
    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name(common_name);

    let key_pair =
        KeyPair::generate().map_err(|e| format!("failed to generate intermediate key: {e}"))?;
    let csr = params
        .serialize_request(&key_pair)
        .map_err(|e| format!("failed to create CSR: {e}"))?;
    let csr_pem = csr
        .pem()
        .map_err(|e| format!("failed to serialize CSR: {e}"))?;

    Ok(ExportedRequest {
        csr_pem,
        key_pem: key_pair.serialize_pem(),
    })
}

/// Sign an intermediate CA CSR with the mount's root CA.
pub(crate) fn sign_intermediate(ca: &CaMaterial, csr_pem: &str) -> Result<String, String> {
    let mut csr_params = CertificateSigningRequestParams::from_pem(csr_pem)
        .map_err(|e| format!("invalid CSR: {e}"))?;
    csr_params.params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
    csr_params.params.key_usages = ca_key_usages();

    let ca_key =
        KeyPair::from_pem(&ca.key_pem).map_err(|e| format!("failed to load CA key: {e}"))?;
    let issuer = Issuer::from_ca_cert_pem(&ca.cert_pem, &ca_key)
        .map_err(|e| format!("failed to create issuer: {e}"))?;

    let signed = csr_params
        .signed_by(&issuer)
        .map_err(|e| format!("failed to sign intermediate: {e}"))?;
    Ok(signed.pem())
}
