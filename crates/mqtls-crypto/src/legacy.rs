//! Legacy passphrase-encrypted PEM blocks (RFC 1421).
//!
//! OpenSSL's "traditional" private key format encrypts the DER body of a
//! PEM block with a CBC block cipher and announces it through
//! `Proc-Type: 4,ENCRYPTED` and `DEK-Info: <cipher>,<hex iv>` headers. The
//! key is derived with `EVP_BytesToKey` (one round of MD5, salted with the
//! first eight bytes of the IV).
//!
//! The scheme is weak: the key derivation is a single MD5 pass and the
//! ciphertext is not authenticated, so a wrong passphrase is only caught
//! by the padding check. It is supported so existing key files keep
//! working. Re-encrypting keys with PKCS#8 is the caller's business; this
//! module never changes the algorithm of a block it is handed.

use std::str::FromStr;

use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use md5::{Digest, Md5};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{CryptoError, DecryptError};

const PROC_TYPE: &str = "Proc-Type";
const PROC_TYPE_ENCRYPTED: &str = "4,ENCRYPTED";
const DEK_INFO: &str = "DEK-Info";
/// `EVP_BytesToKey` salt length; taken from the front of the IV.
const SALT_LEN: usize = 8;

/// Block ciphers accepted in a `DEK-Info` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyCipher {
    DesCbc,
    DesEde3Cbc,
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
}

impl LegacyCipher {
    pub const ALL: [Self; 5] = [
        Self::DesCbc,
        Self::DesEde3Cbc,
        Self::Aes128Cbc,
        Self::Aes192Cbc,
        Self::Aes256Cbc,
    ];

    /// Name as written in the `DEK-Info` header.
    pub const fn name(self) -> &'static str {
        match self {
            Self::DesCbc => "DES-CBC",
            Self::DesEde3Cbc => "DES-EDE3-CBC",
            Self::Aes128Cbc => "AES-128-CBC",
            Self::Aes192Cbc => "AES-192-CBC",
            Self::Aes256Cbc => "AES-256-CBC",
        }
    }

    pub const fn key_len(self) -> usize {
        match self {
            Self::DesCbc => 8,
            Self::Aes128Cbc => 16,
            Self::DesEde3Cbc | Self::Aes192Cbc => 24,
            Self::Aes256Cbc => 32,
        }
    }

    pub const fn block_size(self) -> usize {
        match self {
            Self::DesCbc | Self::DesEde3Cbc => 8,
            Self::Aes128Cbc | Self::Aes192Cbc | Self::Aes256Cbc => 16,
        }
    }

    fn decrypt_in_place(self, key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), DecryptError> {
        match self {
            Self::DesCbc => cbc_decrypt::<des::Des>(key, iv, buf),
            Self::DesEde3Cbc => cbc_decrypt::<des::TdesEde3>(key, iv, buf),
            Self::Aes128Cbc => cbc_decrypt::<aes::Aes128>(key, iv, buf),
            Self::Aes192Cbc => cbc_decrypt::<aes::Aes192>(key, iv, buf),
            Self::Aes256Cbc => cbc_decrypt::<aes::Aes256>(key, iv, buf),
        }
    }

    fn encrypt(self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptError> {
        match self {
            Self::DesCbc => cbc_encrypt::<des::Des>(key, iv, plaintext),
            Self::DesEde3Cbc => cbc_encrypt::<des::TdesEde3>(key, iv, plaintext),
            Self::Aes128Cbc => cbc_encrypt::<aes::Aes128>(key, iv, plaintext),
            Self::Aes192Cbc => cbc_encrypt::<aes::Aes192>(key, iv, plaintext),
            Self::Aes256Cbc => cbc_encrypt::<aes::Aes256>(key, iv, plaintext),
        }
    }
}

impl FromStr for LegacyCipher {
    type Err = DecryptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| DecryptError::UnsupportedCipher(s.to_string()))
    }
}

impl std::fmt::Display for LegacyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), DecryptError>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
    cbc::Decryptor<C>: KeyIvInit + BlockDecryptMut,
{
    cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| DecryptError::InvalidIv)?
        .decrypt_padded_mut::<NoPadding>(buf)
        .map_err(|_| DecryptError::InvalidCiphertextLength)?;
    Ok(())
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptError>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
    cbc::Encryptor<C>: KeyIvInit + BlockEncryptMut,
{
    Ok(cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| DecryptError::InvalidIv)?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// OpenSSL `EVP_BytesToKey` with MD5 and a single iteration.
fn derive_key(passphrase: &[u8], salt: &[u8], key_len: usize) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(Vec::with_capacity(key_len + 16));
    let mut digest = Zeroizing::new(Vec::with_capacity(16));
    while key.len() < key_len {
        let mut hasher = Md5::new();
        hasher.update(digest.as_slice());
        hasher.update(passphrase);
        hasher.update(salt);
        digest.clear();
        digest.extend_from_slice(&hasher.finalize());
        key.extend_from_slice(&digest);
    }
    key.truncate(key_len);
    key
}

/// Whether the block carries a `DEK-Info` header, i.e. is legacy-encrypted.
pub fn is_encrypted_block(block: &pem::Pem) -> bool {
    block.headers().get(DEK_INFO).is_some()
}

/// Decrypt the body of a legacy-encrypted PEM block.
pub fn decrypt_block(
    block: &pem::Pem,
    passphrase: &[u8],
) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
    let dek_info = block
        .headers()
        .get(DEK_INFO)
        .ok_or(DecryptError::NotEncrypted)?;
    let (mode, hex_iv) = dek_info
        .split_once(',')
        .ok_or(DecryptError::MalformedDekInfo)?;
    let cipher: LegacyCipher = mode.trim().parse()?;

    let iv = hex::decode(hex_iv.trim()).map_err(|_| DecryptError::InvalidIv)?;
    if iv.len() != cipher.block_size() {
        return Err(DecryptError::InvalidIv);
    }

    let ciphertext = block.contents();
    if ciphertext.is_empty() || ciphertext.len() % cipher.block_size() != 0 {
        return Err(DecryptError::InvalidCiphertextLength);
    }

    tracing::debug!(cipher = %cipher, "Decrypting legacy PEM block");

    let key = derive_key(passphrase, &iv[..SALT_LEN], cipher.key_len());
    let mut buf = Zeroizing::new(ciphertext.to_vec());
    cipher.decrypt_in_place(&key, &iv, &mut buf)?;

    // Without authentication the PKCS#7 padding is the only passphrase check.
    let pad = buf
        .last()
        .map(|&b| usize::from(b))
        .ok_or(DecryptError::InvalidCiphertextLength)?;
    if pad == 0 || pad > cipher.block_size() {
        return Err(DecryptError::IncorrectPassphrase);
    }
    let body_len = buf.len() - pad;
    if buf[body_len..].iter().any(|&b| usize::from(b) != pad) {
        return Err(DecryptError::IncorrectPassphrase);
    }
    buf.truncate(body_len);
    Ok(buf)
}

fn encode_config() -> pem::EncodeConfig {
    pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF)
}

/// Decrypt a legacy passphrase-encrypted PEM block.
///
/// An empty passphrase returns `data` untouched; nothing is checked in
/// that case, not even whether `data` is PEM. Otherwise the first PEM block
/// in `data` is decrypted and re-encoded under the same label without
/// headers.
pub fn decrypt_pem(data: &[u8], passphrase: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if passphrase.is_empty() {
        return Ok(data.to_vec());
    }

    let block = pem::parse(data)?;
    let plaintext = decrypt_block(&block, passphrase)?;
    let decrypted = pem::Pem::new(block.tag(), plaintext.as_slice());
    Ok(pem::encode_config(&decrypted, encode_config()).into_bytes())
}

/// Encrypt `der` into a legacy PEM block labelled `label`.
///
/// Produces the format [`decrypt_pem`] reads, with a random IV. Only meant
/// for development keys and fixtures; see the module docs.
pub fn encrypt_pem(
    label: &str,
    der: &[u8],
    passphrase: &[u8],
    cipher: LegacyCipher,
) -> Result<String, CryptoError> {
    let mut iv = vec![0u8; cipher.block_size()];
    rand::thread_rng().fill_bytes(&mut iv);

    let key = derive_key(passphrase, &iv[..SALT_LEN], cipher.key_len());
    let ciphertext = cipher.encrypt(&key, &iv, der)?;

    let mut block = pem::Pem::new(label, ciphertext);
    block.headers_mut().add(PROC_TYPE, PROC_TYPE_ENCRYPTED)?;
    block.headers_mut().add(
        DEK_INFO,
        &format!("{},{}", cipher.name(), hex::encode_upper(&iv)),
    )?;
    Ok(pem::encode_config(&block, encode_config()))
}
