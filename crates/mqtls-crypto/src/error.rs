//! Crypto error types.

/// Errors from PEM decoding and legacy key decryption.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Malformed PEM: {0}")]
    MalformedPem(#[from] pem::PemError),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(#[from] DecryptError),
}

/// Why a legacy encrypted PEM block could not be decrypted.
///
/// None of the variants carry key or passphrase material.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecryptError {
    #[error("PEM block is not encrypted (no DEK-Info header)")]
    NotEncrypted,

    #[error("Malformed DEK-Info header")]
    MalformedDekInfo,

    #[error("Unsupported PEM cipher: {0}")]
    UnsupportedCipher(String),

    #[error("Invalid initialization vector in DEK-Info header")]
    InvalidIv,

    #[error("Encrypted PEM data is not a multiple of the block size")]
    InvalidCiphertextLength,

    #[error("Incorrect passphrase")]
    IncorrectPassphrase,
}
