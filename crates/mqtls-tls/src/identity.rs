//! Client certificate + private key pair for mutual TLS.

use mqtls_crypto::is_encrypted_block;
use rustls::InconsistentKeys;
use rustls::pki_types::{
    CertificateDer, PrivateKeyDer, PrivatePkcs1KeyDer, PrivatePkcs8KeyDer, PrivateSec1KeyDer,
};
use rustls::sign::CertifiedKey;

use crate::error::TlsError;

const CERTIFICATE: &str = "CERTIFICATE";

/// The identity a client presents during the TLS handshake.
///
/// Invariant: the chain is non-empty and the leaf's public key belongs to
/// the private key.
pub struct ClientIdentity {
    cert_chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl Clone for ClientIdentity {
    fn clone(&self) -> Self {
        Self {
            cert_chain: self.cert_chain.clone(),
            key: self.key.clone_key(),
        }
    }
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("chain_len", &self.cert_chain.len())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn mismatch(reason: impl Into<String>) -> TlsError {
    TlsError::KeyPairMismatch(reason.into())
}

impl ClientIdentity {
    /// Pair a PEM certificate chain with a PEM private key.
    ///
    /// Every `CERTIFICATE` block in `cert_pem` goes into the chain, leaf
    /// first. The first `PRIVATE KEY`, `RSA PRIVATE KEY` or `EC PRIVATE KEY`
    /// block in `key_pem` is the key; it must already be decrypted.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, TlsError> {
        let cert_chain = certificate_chain(cert_pem)?;
        let key = private_key(key_pem)?;
        let identity = Self { cert_chain, key };
        identity.verify_pair()?;
        Ok(identity)
    }

    pub fn cert_chain(&self) -> &[CertificateDer<'static>] {
        &self.cert_chain
    }

    /// End-entity certificate.
    pub fn leaf(&self) -> &CertificateDer<'static> {
        // Non-empty, checked in `certificate_chain`.
        &self.cert_chain[0]
    }

    pub const fn private_key(&self) -> &PrivateKeyDer<'static> {
        &self.key
    }

    fn verify_pair(&self) -> Result<(), TlsError> {
        let provider = rustls::crypto::ring::default_provider();
        let signing_key = provider
            .key_provider
            .load_private_key(self.key.clone_key())
            .map_err(|e| mismatch(format!("unusable private key: {e}")))?;

        match CertifiedKey::new(self.cert_chain.clone(), signing_key).keys_match() {
            Ok(()) => Ok(()),
            Err(rustls::Error::InconsistentKeys(InconsistentKeys::KeyMismatch)) => Err(mismatch(
                "certificate public key does not match the private key",
            )),
            Err(rustls::Error::InconsistentKeys(InconsistentKeys::Unknown)) => {
                tracing::debug!("Key type cannot be checked against the certificate");
                Ok(())
            }
            Err(e) => Err(mismatch(format!("invalid client certificate: {e}"))),
        }
    }
}

fn certificate_chain(cert_pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let blocks = pem::parse_many(cert_pem)
        .map_err(|e| mismatch(format!("malformed certificate PEM: {e}")))?;
    if blocks.is_empty() {
        return Err(mismatch("no PEM data in certificate input"));
    }
    let saw_key = blocks.iter().any(|b| b.tag().ends_with("PRIVATE KEY"));

    let chain: Vec<_> = blocks
        .into_iter()
        .filter(|b| b.tag() == CERTIFICATE)
        .map(|b| CertificateDer::from(b.into_contents()))
        .collect();

    if chain.is_empty() {
        return Err(if saw_key {
            mismatch("found a private key but no certificate in certificate input; were the files swapped?")
        } else {
            mismatch("no CERTIFICATE block in certificate input")
        });
    }
    Ok(chain)
}

fn private_key(key_pem: &[u8]) -> Result<PrivateKeyDer<'static>, TlsError> {
    let blocks =
        pem::parse_many(key_pem).map_err(|e| mismatch(format!("malformed private key PEM: {e}")))?;
    let saw_certificate = blocks.iter().any(|b| b.tag() == CERTIFICATE);

    for block in blocks {
        let tag = block.tag().to_owned();
        match tag.as_str() {
            "PRIVATE KEY" | "RSA PRIVATE KEY" | "EC PRIVATE KEY" => {}
            "ENCRYPTED PRIVATE KEY" => {
                return Err(mismatch(
                    "encrypted PKCS#8 keys are not supported; use an unencrypted or legacy-encrypted key",
                ));
            }
            _ => continue,
        }
        if is_encrypted_block(&block) {
            return Err(mismatch(
                "private key is encrypted but no passphrase was supplied",
            ));
        }

        let der = block.into_contents();
        return Ok(match tag.as_str() {
            "RSA PRIVATE KEY" => PrivateKeyDer::Pkcs1(PrivatePkcs1KeyDer::from(der)),
            "EC PRIVATE KEY" => PrivateKeyDer::Sec1(PrivateSec1KeyDer::from(der)),
            _ => PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(der)),
        });
    }

    Err(if saw_certificate {
        mismatch("found a certificate but no private key in key input; were the files swapped?")
    } else {
        mismatch("no private key in key input")
    })
}
