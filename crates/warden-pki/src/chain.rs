//! PEM bundle splitting and chain verification.

use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::PkiError;

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Split a PEM bundle into the DER bytes of its certificates, in order.
///
/// # Errors
///
/// Returns `PkiError::InvalidChain` if the bundle is not valid PEM.
pub fn split_pem_chain(bundle: &str) -> Result<Vec<Vec<u8>>, PkiError> {
    let blocks = pem::parse_many(bundle.as_bytes())
        .map_err(|e| PkiError::InvalidChain(format!("failed to parse PEM: {e}")))?;
    Ok(blocks
        .into_iter()
        .filter(|block| block.tag() == CERTIFICATE_TAG)
        .map(|block| block.contents().to_vec())
        .collect())
}

/// Verify a leaf-first chain: each certificate is signed by the next, and
/// the last one is a self-signed root.
///
/// # Errors
///
/// Returns `PkiError::InvalidChain` describing the first broken link.
pub fn verify_chain(bundle: &str) -> Result<(), PkiError> {
    let ders = split_pem_chain(bundle)?;
    if ders.len() < 2 {
        return Err(PkiError::InvalidChain(format!(
            "expected at least 2 certificates, found {}",
            ders.len()
        )));
    }

    let certs = ders
        .iter()
        .enumerate()
        .map(|(index, der)| {
            X509Certificate::from_der(der)
                .map(|(_, cert)| cert)
                .map_err(|e| PkiError::InvalidChain(format!("certificate {index}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (index, pair) in certs.windows(2).enumerate() {
        let (child, parent) = (&pair[0], &pair[1]);
        if child.issuer().to_string() != parent.subject().to_string() {
            return Err(PkiError::InvalidChain(format!(
                "certificate {index} was not issued by certificate {}",
                index + 1
            )));
        }
        child
            .verify_signature(Some(parent.public_key()))
            .map_err(|e| {
                PkiError::InvalidChain(format!("certificate {index} signature: {e}"))
            })?;
    }

    if let Some(root) = certs.last() {
        root.verify_signature(None)
            .map_err(|e| PkiError::InvalidChain(format!("root is not self-signed: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_pem_input_is_rejected() {
        let bundle = "-----BEGIN CERTIFICATE-----\n!!not base64!!\n-----END CERTIFICATE-----\n";
        assert!(split_pem_chain(bundle).is_err());
    }

    #[test]
    fn empty_bundle_has_no_certificates() {
        assert!(split_pem_chain("").unwrap().is_empty());
        assert!(matches!(verify_chain(""), Err(PkiError::InvalidChain(_))));
    }
}
