//! Development certificate generation for mTLS client identities.
//!
//! Produces a self-signed CA and client certificates signed by it, for
//! local brokers and for tests. NOT suitable for production use.
//!
//! Requires the `certs` feature to be enabled.

use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair,
    KeyUsagePurpose,
};

use crate::error::CryptoError;
use crate::legacy::{LegacyCipher, encrypt_pem};

/// CA material for signing client certificates.
pub struct CaBundle {
    /// CA certificate parameters (needed for signing).
    pub params: CertificateParams,
    /// CA key pair.
    pub key_pair: KeyPair,
    /// PEM-encoded CA certificate.
    pub ca_cert_pem: String,
}

/// PEM-encoded client certificate bundle.
pub struct ClientCertBundle {
    /// PEM-encoded client certificate.
    pub cert_pem: String,
    /// PEM-encoded (PKCS#8, unencrypted) client private key.
    pub key_pem: String,
    /// PEM-encoded CA certificate that signed `cert_pem`.
    pub ca_cert_pem: String,
}

impl std::fmt::Debug for ClientCertBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCertBundle")
            .field("cert_pem", &self.cert_pem)
            .field("key_pem", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ClientCertBundle {
    /// The client key re-wrapped in a legacy passphrase-encrypted PEM block.
    pub fn encrypted_key_pem(
        &self,
        passphrase: &[u8],
        cipher: LegacyCipher,
    ) -> Result<String, CryptoError> {
        let block = pem::parse(&self.key_pem)?;
        encrypt_pem(block.tag(), block.contents(), passphrase, cipher)
    }
}

/// Certificate generation errors.
#[derive(Debug, thiserror::Error)]
pub enum CertError {
    /// An error occurred during certificate generation or signing.
    #[error("Certificate generation error: {0}")]
    Generation(String),
}

/// Generate a self-signed CA suitable for signing client and server
/// certificates.
pub fn generate_ca(org_name: &str) -> Result<CaBundle, CertError> {
    let mut params = CertificateParams::default();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params
        .distinguished_name
        .push(DnType::CommonName, format!("{org_name} CA"));
    params
        .distinguished_name
        .push(DnType::OrganizationName, org_name);
    params.key_usages.push(KeyUsagePurpose::KeyCertSign);
    params.key_usages.push(KeyUsagePurpose::CrlSign);

    let key_pair = KeyPair::generate().map_err(|e| CertError::Generation(e.to_string()))?;
    let ca_cert = params
        .self_signed(&key_pair)
        .map_err(|e| CertError::Generation(e.to_string()))?;

    Ok(CaBundle {
        ca_cert_pem: ca_cert.pem(),
        params,
        key_pair,
    })
}

/// Generate a client certificate signed by the given CA.
///
/// The certificate carries `ExtendedKeyUsagePurpose::ClientAuth` and
/// `client_name` as its Common Name.
pub fn generate_client_cert(
    ca: &CaBundle,
    client_name: &str,
) -> Result<ClientCertBundle, CertError> {
    let issuer = Issuer::from_params(&ca.params, &ca.key_pair);

    let mut params = CertificateParams::default();
    params
        .distinguished_name
        .push(DnType::CommonName, client_name);
    params
        .extended_key_usages
        .push(ExtendedKeyUsagePurpose::ClientAuth);

    let client_key = KeyPair::generate().map_err(|e| CertError::Generation(e.to_string()))?;
    let client_cert = params
        .signed_by(&client_key, &issuer)
        .map_err(|e| CertError::Generation(e.to_string()))?;

    Ok(ClientCertBundle {
        cert_pem: client_cert.pem(),
        key_pem: client_key.serialize_pem(),
        ca_cert_pem: ca.ca_cert_pem.clone(),
    })
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::needless_pass_by_value
)]
mod tests {
    use super::*;
    use crate::legacy::decrypt_pem;

    #[test]
    fn generate_ca_produces_valid_pem() {
        let ca = generate_ca("mqtls Test").unwrap();
        assert!(ca.ca_cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(ca.ca_cert_pem.contains("END CERTIFICATE"));
    }

    #[test]
    fn generate_client_cert_has_correct_pem() {
        let ca = generate_ca("mqtls Test").unwrap();
        let bundle = generate_client_cert(&ca, "consumer-001").unwrap();

        assert!(bundle.cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(bundle.key_pem.contains("BEGIN PRIVATE KEY"));
        assert!(bundle.ca_cert_pem.contains("BEGIN CERTIFICATE"));
        assert_ne!(bundle.cert_pem, bundle.ca_cert_pem);
    }

    #[test]
    fn multiple_clients_get_different_certs() {
        let ca = generate_ca("mqtls Test").unwrap();
        let c1 = generate_client_cert(&ca, "producer-a").unwrap();
        let c2 = generate_client_cert(&ca, "producer-b").unwrap();

        assert_ne!(c1.cert_pem, c2.cert_pem);
        assert_ne!(c1.key_pem, c2.key_pem);
        assert_eq!(c1.ca_cert_pem, c2.ca_cert_pem);
    }

    #[test]
    fn encrypted_key_decrypts_back_to_original_der() {
        let ca = generate_ca("mqtls Test").unwrap();
        let bundle = generate_client_cert(&ca, "consumer-enc").unwrap();

        let encrypted = bundle
            .encrypted_key_pem(b"broker-pass", LegacyCipher::Aes256Cbc)
            .unwrap();
        assert!(encrypted.contains("DEK-Info: AES-256-CBC,"));

        let decrypted = decrypt_pem(encrypted.as_bytes(), b"broker-pass").unwrap();
        let original = pem::parse(&bundle.key_pem).unwrap();
        let roundtrip = pem::parse(decrypted).unwrap();
        assert_eq!(roundtrip.tag(), "PRIVATE KEY");
        assert_eq!(roundtrip.contents(), original.contents());
    }

    #[test]
    fn debug_redacts_key() {
        let ca = generate_ca("mqtls Test").unwrap();
        let bundle = generate_client_cert(&ca, "consumer-dbg").unwrap();
        let dbg = format!("{bundle:?}");
        assert!(!dbg.contains("PRIVATE KEY"));
    }
}
