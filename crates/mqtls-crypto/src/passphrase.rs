//! Private key passphrase.

use serde::Deserialize;
use zeroize::Zeroizing;

/// Passphrase protecting a legacy-encrypted private key.
///
/// An empty passphrase means "the key is not encrypted". The bytes are
/// wiped on drop and never printed; the type deserializes from a string
/// but deliberately has no `Serialize` impl.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct Passphrase(Zeroizing<Vec<u8>>);

impl Passphrase {
    /// An empty passphrase.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            f.write_str("Passphrase(<empty>)")
        } else {
            f.write_str("Passphrase([REDACTED])")
        }
    }
}

impl From<Vec<u8>> for Passphrase {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }
}

impl From<&[u8]> for Passphrase {
    fn from(bytes: &[u8]) -> Self {
        Self::from(bytes.to_vec())
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Self::from(s.into_bytes())
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self::from(s.as_bytes())
    }
}
