//! TLS configuration errors.

use std::path::{Path, PathBuf};

use mqtls_crypto::{CryptoError, DecryptError};

/// Errors from building a client TLS configuration.
///
/// Messages name files and failure reasons only; passphrases and key bytes
/// never reach them.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Failed to read {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed PEM in {}: {source}", .path.display())]
    MalformedPem {
        path: PathBuf,
        source: pem::PemError,
    },

    #[error("Failed to decrypt private key {}: {source}", .path.display())]
    DecryptionFailed {
        path: PathBuf,
        source: DecryptError,
    },

    #[error("Client certificate and key are not a valid pair: {0}")]
    KeyPairMismatch(String),

    #[error("No valid CA certificates found in {}", .path.display())]
    InvalidTrustStore { path: PathBuf },

    #[error("Failed to build rustls client config: {0}")]
    ClientConfig(String),
}

/// Discriminant of a [`TlsError`], for callers that branch on the failure
/// class without caring about its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlsErrorKind {
    FileRead,
    MalformedPem,
    DecryptionFailed,
    KeyPairMismatch,
    InvalidTrustStore,
    ClientConfig,
}

impl TlsError {
    pub const fn kind(&self) -> TlsErrorKind {
        match self {
            Self::FileRead { .. } => TlsErrorKind::FileRead,
            Self::MalformedPem { .. } => TlsErrorKind::MalformedPem,
            Self::DecryptionFailed { .. } => TlsErrorKind::DecryptionFailed,
            Self::KeyPairMismatch(_) => TlsErrorKind::KeyPairMismatch,
            Self::InvalidTrustStore { .. } => TlsErrorKind::InvalidTrustStore,
            Self::ClientConfig(_) => TlsErrorKind::ClientConfig,
        }
    }

    pub(crate) fn file_read(path: &Path, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Attach the file the crypto layer was working on.
    pub(crate) fn from_crypto(path: &Path, err: CryptoError) -> Self {
        match err {
            CryptoError::MalformedPem(source) => Self::MalformedPem {
                path: path.to_path_buf(),
                source,
            },
            CryptoError::DecryptionFailed(source) => Self::DecryptionFailed {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}
