//! Client TLS configuration assembled from PEM files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mqtls_core::TlsSettings;
use mqtls_crypto::Passphrase;
use rustls::{ClientConfig, RootCertStore};
use tracing::{debug, info, warn};

use crate::error::TlsError;
use crate::identity::ClientIdentity;
use crate::key::{read_file, read_key};
use crate::trust::TrustStore;
use crate::verifier::InsecureServerCertVerifier;

/// Everything the connection layer needs to open a TLS session to a broker.
///
/// Immutable once built. The default value is plain TLS: platform roots, no
/// client certificate, verification on.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    client_identity: Option<ClientIdentity>,
    trust_store: Option<TrustStore>,
    insecure_skip_verify: bool,
}

impl TlsConfig {
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::new()
    }

    /// The certificate presented for client authentication, if any.
    pub const fn client_identity(&self) -> Option<&ClientIdentity> {
        self.client_identity.as_ref()
    }

    /// Custom CA roots. `None` means the platform roots are used.
    pub const fn trust_store(&self) -> Option<&TrustStore> {
        self.trust_store.as_ref()
    }

    pub const fn insecure_skip_verify(&self) -> bool {
        self.insecure_skip_verify
    }

    /// Build a rustls client config from this configuration.
    ///
    /// Uses the `ring` provider with its default protocol versions. Called
    /// once per client; the result is shared across connections.
    pub fn client_config(&self) -> Result<Arc<ClientConfig>, TlsError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| TlsError::ClientConfig(format!("protocol versions: {e}")))?;

        let builder = if self.insecure_skip_verify {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(InsecureServerCertVerifier::new(
                    provider,
                )))
        } else {
            builder.with_root_certificates(self.root_store())
        };

        let config = match &self.client_identity {
            Some(identity) => builder
                .with_client_auth_cert(
                    identity.cert_chain().to_vec(),
                    identity.private_key().clone_key(),
                )
                .map_err(|e| TlsError::ClientConfig(format!("client certificate: {e}")))?,
            None => builder.with_no_client_auth(),
        };

        Ok(Arc::new(config))
    }

    fn root_store(&self) -> RootCertStore {
        if let Some(store) = &self.trust_store {
            return store.roots().clone();
        }

        let mut roots = RootCertStore::empty();
        let native = rustls_native_certs::load_native_certs();
        for err in &native.errors {
            warn!(error = %err, "Failed to load platform certificate");
        }
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        debug!(added, ignored, "Loaded platform trust roots");
        if added == 0 {
            warn!("No platform trust roots available; server verification will fail");
        }
        roots
    }
}

/// Builder for [`TlsConfig`].
///
/// Every input is optional. A client identity needs both the certificate and
/// the key; a CA bundle replaces the platform roots. Empty paths count as
/// unset.
#[derive(Debug, Clone, Default)]
pub struct TlsConfigBuilder {
    client_cert: Option<PathBuf>,
    client_key: Option<PathBuf>,
    key_passphrase: Passphrase,
    ca_cert: Option<PathBuf>,
    insecure_skip_verify: bool,
}

fn non_empty(path: PathBuf) -> Option<PathBuf> {
    (!path.as_os_str().is_empty()).then_some(path)
}

impl TlsConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &TlsSettings) -> Self {
        Self {
            client_cert: settings.client_cert.clone().and_then(non_empty),
            client_key: settings.client_key.clone().and_then(non_empty),
            key_passphrase: settings.key_passphrase.clone(),
            ca_cert: settings.ca_cert.clone().and_then(non_empty),
            insecure_skip_verify: settings.insecure_skip_verify,
        }
    }

    /// PEM file holding the client certificate chain, leaf first.
    #[must_use]
    pub fn client_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_cert = non_empty(path.into());
        self
    }

    /// PEM file holding the client private key, optionally legacy-encrypted.
    #[must_use]
    pub fn client_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_key = non_empty(path.into());
        self
    }

    /// Passphrase for a legacy-encrypted client key. Empty means the key is
    /// not encrypted.
    #[must_use]
    pub fn key_passphrase(mut self, passphrase: impl Into<Passphrase>) -> Self {
        self.key_passphrase = passphrase.into();
        self
    }

    /// PEM bundle of CA certificates to trust instead of the platform roots.
    #[must_use]
    pub fn ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = non_empty(path.into());
        self
    }

    /// Accept any server certificate.
    ///
    /// DANGEROUS: disables server authentication entirely. Meant for local
    /// development against brokers with throwaway certificates.
    #[must_use]
    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    /// Read the configured files and assemble the configuration.
    ///
    /// Files are re-read on every call. Any failure aborts the build.
    pub fn build(&self) -> Result<TlsConfig, TlsError> {
        let client_identity = match (&self.client_cert, &self.client_key) {
            (Some(cert), Some(key)) => Some(load_identity(cert, key, &self.key_passphrase)?),
            (Some(path), None) | (None, Some(path)) => {
                warn!(
                    path = %path.display(),
                    "Client certificate and key must both be set; continuing without client authentication"
                );
                None
            }
            (None, None) => None,
        };

        let trust_store = self.ca_cert.as_deref().map(TrustStore::load).transpose()?;

        let config = TlsConfig {
            client_identity,
            trust_store,
            insecure_skip_verify: self.insecure_skip_verify,
        };

        info!(
            client_auth = config.client_identity.is_some(),
            trust_anchors = config.trust_store.as_ref().map_or(0, TrustStore::len),
            insecure_skip_verify = config.insecure_skip_verify,
            "TLS configuration built"
        );
        Ok(config)
    }
}

fn load_identity(
    cert_path: &Path,
    key_path: &Path,
    passphrase: &Passphrase,
) -> Result<ClientIdentity, TlsError> {
    let cert_pem = read_file(cert_path)?;
    let key_pem = read_key(key_path, passphrase)?;
    ClientIdentity::from_pem(&cert_pem, &key_pem)
}

/// Build a [`TlsConfig`] from positional inputs.
///
/// `None` or empty paths skip the corresponding step; an empty passphrase
/// means the key is not encrypted.
pub fn build_tls_config(
    client_cert: Option<&Path>,
    client_key: Option<&Path>,
    key_passphrase: &[u8],
    ca_cert: Option<&Path>,
    insecure_skip_verify: bool,
) -> Result<TlsConfig, TlsError> {
    let mut builder = TlsConfigBuilder::new()
        .key_passphrase(key_passphrase)
        .insecure_skip_verify(insecure_skip_verify);
    if let Some(path) = client_cert {
        builder = builder.client_cert(path);
    }
    if let Some(path) = client_key {
        builder = builder.client_key(path);
    }
    if let Some(path) = ca_cert {
        builder = builder.ca_cert(path);
    }
    builder.build()
}
