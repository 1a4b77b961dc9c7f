#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::{Path, PathBuf};

use mqtls_crypto::LegacyCipher;
use mqtls_crypto::certs::{ClientCertBundle, generate_ca, generate_client_cert};
use mqtls_tls::{TlsConfigBuilder, TlsErrorKind, build_tls_config};
use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;
use tempfile::TempDir;

/// Client cert, key and CA written to a temp dir.
struct Fixture {
    dir: TempDir,
    bundle: ClientCertBundle,
}

impl Fixture {
    fn new(name: &str) -> Self {
        let ca = generate_ca("mqtls Integration").unwrap();
        let bundle = generate_client_cert(&ca, name).unwrap();
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
            bundle,
        };
        fixture.write("client.pem", &fixture.bundle.cert_pem);
        fixture.write("client-key.pem", &fixture.bundle.key_pem);
        fixture.write("ca.pem", &fixture.bundle.ca_cert_pem);
        fixture
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

fn der_of(pem_text: &str) -> Vec<u8> {
    pem::parse(pem_text).unwrap().into_contents()
}

#[test]
fn nothing_requested_gives_default_config() {
    let config = build_tls_config(None, None, b"", None, false).unwrap();
    assert!(config.client_identity().is_none());
    assert!(config.trust_store().is_none());
    assert!(!config.insecure_skip_verify());
}

#[test]
fn empty_paths_give_default_config() {
    let empty = Path::new("");
    let config = build_tls_config(Some(empty), Some(empty), b"", Some(empty), false).unwrap();
    assert!(config.client_identity().is_none());
    assert!(config.trust_store().is_none());
}

#[test]
fn cert_and_key_without_ca() {
    let fx = Fixture::new("consumer-1");
    let config = TlsConfigBuilder::new()
        .client_cert(fx.path("client.pem"))
        .client_key(fx.path("client-key.pem"))
        .build()
        .unwrap();

    let identity = config.client_identity().expect("client identity");
    assert_eq!(identity.leaf().as_ref(), der_of(&fx.bundle.cert_pem).as_slice());
    assert_eq!(
        identity.private_key().secret_der(),
        der_of(&fx.bundle.key_pem).as_slice()
    );
    assert!(config.trust_store().is_none());
    assert!(!config.insecure_skip_verify());
}

#[test]
fn full_mutual_tls_config() {
    let fx = Fixture::new("consumer-2");
    let config = build_tls_config(
        Some(&fx.path("client.pem")),
        Some(&fx.path("client-key.pem")),
        b"",
        Some(&fx.path("ca.pem")),
        false,
    )
    .unwrap();

    assert!(config.client_identity().is_some());
    assert_eq!(config.trust_store().unwrap().len(), 1);

    let client = config.client_config().unwrap();
    assert!(client.client_auth_cert_resolver.has_certs());
}

#[test]
fn legacy_encrypted_key_with_passphrase() {
    let fx = Fixture::new("consumer-3");
    for cipher in LegacyCipher::ALL {
        let encrypted = fx.bundle.encrypted_key_pem(b"kafka-pw", cipher).unwrap();
        let key_path = fx.write("client-key.enc.pem", &encrypted);

        let config = TlsConfigBuilder::new()
            .client_cert(fx.path("client.pem"))
            .client_key(&key_path)
            .key_passphrase("kafka-pw")
            .build()
            .unwrap_or_else(|e| panic!("{cipher}: {e}"));

        assert_eq!(
            config.client_identity().unwrap().private_key().secret_der(),
            der_of(&fx.bundle.key_pem).as_slice()
        );
    }
}

#[test]
fn legacy_encrypted_key_with_wrong_passphrase() {
    let fx = Fixture::new("consumer-4");
    let encrypted = fx
        .bundle
        .encrypted_key_pem(b"kafka-pw", LegacyCipher::Aes256Cbc)
        .unwrap();
    let key_path = fx.write("client-key.enc.pem", &encrypted);

    let result = TlsConfigBuilder::new()
        .client_cert(fx.path("client.pem"))
        .client_key(&key_path)
        .key_passphrase("not-the-passphrase")
        .build();

    // With a wrong key the padding check misses about 1 time in 256; the
    // garbage DER is then rejected when the pair is assembled.
    let err = result.unwrap_err();
    assert!(
        matches!(
            err.kind(),
            TlsErrorKind::DecryptionFailed | TlsErrorKind::KeyPairMismatch
        ),
        "{err}"
    );
    let msg = err.to_string();
    assert!(!msg.contains("not-the-passphrase"), "{msg}");
}

#[test]
fn encrypted_key_without_passphrase() {
    let fx = Fixture::new("consumer-5");
    let encrypted = fx
        .bundle
        .encrypted_key_pem(b"kafka-pw", LegacyCipher::Aes128Cbc)
        .unwrap();
    let key_path = fx.write("client-key.enc.pem", &encrypted);

    let err = TlsConfigBuilder::new()
        .client_cert(fx.path("client.pem"))
        .client_key(&key_path)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), TlsErrorKind::KeyPairMismatch);
}

#[test]
fn passphrase_on_plain_key_fails_decryption() {
    let fx = Fixture::new("consumer-6");
    let err = TlsConfigBuilder::new()
        .client_cert(fx.path("client.pem"))
        .client_key(fx.path("client-key.pem"))
        .key_passphrase("unneeded")
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), TlsErrorKind::DecryptionFailed);
    assert!(err.to_string().contains("client-key.pem"));
}

#[test]
fn mismatched_cert_and_key() {
    let fx = Fixture::new("consumer-7");
    let other = Fixture::new("someone-else");

    let err = build_tls_config(
        Some(&fx.path("client.pem")),
        Some(&other.path("client-key.pem")),
        b"",
        None,
        false,
    )
    .unwrap_err();
    assert_eq!(err.kind(), TlsErrorKind::KeyPairMismatch);
}

#[test]
fn ca_bundle_with_one_corrupt_certificate() {
    let fx = Fixture::new("consumer-8");
    let corrupt = pem::encode(&pem::Pem::new("CERTIFICATE", b"corrupted".to_vec()));
    let bundle_path = fx.write("bundle.pem", &format!("{}{corrupt}", fx.bundle.ca_cert_pem));

    let config = TlsConfigBuilder::new()
        .ca_cert(&bundle_path)
        .build()
        .unwrap();

    let mut expected = RootCertStore::empty();
    expected
        .add(CertificateDer::from(der_of(&fx.bundle.ca_cert_pem)))
        .unwrap();
    let store = config.trust_store().unwrap();
    assert_eq!(store.roots().roots, expected.roots);
    assert_eq!(store.skipped(), 1);
}

#[test]
fn ca_bundle_without_certificates() {
    let fx = Fixture::new("consumer-9");
    let bundle_path = fx.write("bundle.pem", &fx.bundle.key_pem);

    let err = TlsConfigBuilder::new()
        .ca_cert(&bundle_path)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), TlsErrorKind::InvalidTrustStore);
}

#[test]
fn missing_files_are_reported_with_their_path() {
    let fx = Fixture::new("consumer-10");
    let cases = [
        (fx.path("nope.pem"), fx.path("client-key.pem"), None),
        (fx.path("client.pem"), fx.path("nope.pem"), None),
        (
            fx.path("client.pem"),
            fx.path("client-key.pem"),
            Some(fx.path("nope.pem")),
        ),
    ];
    for (cert, key, ca) in cases {
        let err = build_tls_config(Some(&cert), Some(&key), b"", ca.as_deref(), false).unwrap_err();
        assert_eq!(err.kind(), TlsErrorKind::FileRead);
        assert!(err.to_string().contains("nope.pem"), "{err}");
    }
}

#[test]
fn identity_failure_discards_everything() {
    let fx = Fixture::new("consumer-11");
    let other = Fixture::new("consumer-12");

    let result = TlsConfigBuilder::new()
        .client_cert(fx.path("client.pem"))
        .client_key(other.path("client-key.pem"))
        .ca_cert(fx.path("ca.pem"))
        .insecure_skip_verify(true)
        .build();
    assert!(result.is_err());
}

#[test]
fn insecure_skip_verify_is_copied_verbatim() {
    let fx = Fixture::new("consumer-13");
    let config = build_tls_config(None, None, b"", Some(&fx.path("ca.pem")), true).unwrap();
    assert!(config.insecure_skip_verify());
    assert!(config.trust_store().is_some());
    config.client_config().unwrap();
}

#[test]
fn builds_are_independent() {
    let fx = Fixture::new("consumer-14");
    let builder = TlsConfigBuilder::new()
        .client_cert(fx.path("client.pem"))
        .client_key(fx.path("client-key.pem"));

    let first = builder.build().unwrap();
    // Files are re-read: replacing the key breaks the next build only.
    let other = Fixture::new("consumer-15");
    fx.write("client-key.pem", &other.bundle.key_pem);

    assert!(first.client_identity().is_some());
    assert_eq!(
        builder.build().unwrap_err().kind(),
        TlsErrorKind::KeyPairMismatch
    );
}

#[test]
fn config_is_shareable_across_threads() {
    let fx = Fixture::new("consumer-16");
    let builder = TlsConfigBuilder::new()
        .client_cert(fx.path("client.pem"))
        .client_key(fx.path("client-key.pem"))
        .ca_cert(fx.path("ca.pem"));

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| builder.build())).collect();
        for h in handles {
            assert!(h.join().unwrap().is_ok());
        }
    });
}
