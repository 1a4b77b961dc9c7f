//! Reading PEM files, decrypting private keys on the way in.

use std::path::Path;

use mqtls_crypto::{Passphrase, decrypt_pem};
use zeroize::Zeroizing;

use crate::error::TlsError;

/// Read a whole PEM file.
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, TlsError> {
    let data = std::fs::read(path).map_err(|e| TlsError::file_read(path, e))?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "Read PEM file");
    Ok(data)
}

/// Read the private key at `path`, decrypting it with `passphrase`.
///
/// With an empty passphrase the file content is returned as-is. Decryption
/// failures carry `path`.
pub fn read_key(path: &Path, passphrase: &Passphrase) -> Result<Zeroizing<Vec<u8>>, TlsError> {
    let data = Zeroizing::new(read_file(path)?);
    decrypt_pem(&data, passphrase.as_bytes())
        .map(Zeroizing::new)
        .map_err(|e| TlsError::from_crypto(path, e))
}
