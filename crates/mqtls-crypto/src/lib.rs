//! `mqtls` key material handling
//!
//! Everything that touches secret bytes before they reach rustls:
//!
//! - **Passphrase**: zeroized, never printed or serialized
//! - **Legacy PEM**: RFC 1421 `DEK-Info` decryption (DES, 3DES, AES-CBC with
//!   an MD5 `EVP_BytesToKey` key), and the matching encryption for dev keys
//! - **Certs** (feature `certs`): rcgen CA and client certificate generation

#[cfg(feature = "certs")]
pub mod certs;
pub mod error;
pub mod legacy;
pub mod passphrase;

pub use error::{CryptoError, DecryptError};
pub use legacy::{LegacyCipher, decrypt_block, decrypt_pem, encrypt_pem, is_encrypted_block};
pub use passphrase::Passphrase;
