//! `mqtls` client TLS configuration
//!
//! Turns three optional PEM files (client certificate, client key, CA
//! bundle) plus a key passphrase into a configuration for mutually
//! authenticated TLS:
//!
//! - **Key reader**: reads the key file and decrypts legacy `DEK-Info` keys
//! - **Client identity**: certificate chain + matching private key
//! - **Trust store**: CA anchors parsed leniently from a bundle
//! - **Builder**: assembles [`TlsConfig`], convertible to a
//!   `rustls::ClientConfig`
//!
//! Nothing is cached; every build reads the files again.

pub mod config;
pub mod error;
pub mod identity;
pub mod key;
pub mod trust;
pub mod verifier;

pub use config::{TlsConfig, TlsConfigBuilder, build_tls_config};
pub use error::{TlsError, TlsErrorKind};
pub use identity::ClientIdentity;
pub use key::read_key;
pub use mqtls_crypto::Passphrase;
pub use trust::TrustStore;
