//! `mqtls check`: build the client TLS configuration from the resolved
//! settings and report what a client would present and trust.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use mqtls_core::TlsSettings;
use mqtls_tls::{ClientIdentity, Passphrase, TlsConfig, TlsConfigBuilder};
use x509_parser::parse_x509_certificate;

#[derive(Debug, Default, Args)]
pub struct CheckArgs {
    /// Client certificate chain (PEM), leaf first
    #[arg(long)]
    pub client_cert: Option<PathBuf>,

    /// Client private key (PEM), plain or legacy-encrypted
    #[arg(long)]
    pub client_key: Option<PathBuf>,

    /// CA bundle (PEM) trusted instead of the platform roots
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,

    /// Passphrase for a legacy-encrypted key. Prefer MQTLS_KEY_PASSPHRASE;
    /// command lines are visible to other users.
    #[arg(long)]
    pub key_passphrase: Option<String>,

    /// Accept any server certificate (development only)
    #[arg(long)]
    pub insecure_skip_verify: bool,
}

impl CheckArgs {
    /// Apply command-line flags on top of settings from files and environment.
    pub fn apply(&self, settings: &mut TlsSettings) {
        if let Some(path) = &self.client_cert {
            settings.client_cert = Some(path.clone());
        }
        if let Some(path) = &self.client_key {
            settings.client_key = Some(path.clone());
        }
        if let Some(path) = &self.ca_cert {
            settings.ca_cert = Some(path.clone());
        }
        if let Some(passphrase) = &self.key_passphrase {
            settings.key_passphrase = Passphrase::from(passphrase.as_str());
        }
        if self.insecure_skip_verify {
            settings.insecure_skip_verify = true;
        }
    }
}

/// Build the configuration, convert it for rustls and summarise it.
pub fn run(settings: &TlsSettings) -> Result<Report> {
    if settings.insecure_skip_verify {
        tracing::warn!(
            "Server certificate verification is DISABLED; any broker, or anyone in between, will be accepted"
        );
    }

    let config = TlsConfigBuilder::from_settings(settings)
        .build()
        .context("Failed to build TLS configuration")?;
    config
        .client_config()
        .context("Failed to create rustls client configuration")?;

    Report::from_config(&config)
}

/// Human-readable summary of a built [`TlsConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub identity: Option<IdentitySummary>,
    pub trust: TrustSummary,
    pub insecure_skip_verify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySummary {
    pub subject: String,
    pub issuer: String,
    pub not_after: String,
    pub currently_valid: bool,
    pub chain_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustSummary {
    Platform,
    Bundle { anchors: usize, skipped: usize },
}

impl Report {
    pub fn from_config(config: &TlsConfig) -> Result<Self> {
        let identity = config
            .client_identity()
            .map(IdentitySummary::from_identity)
            .transpose()?;
        let trust = config
            .trust_store()
            .map_or(TrustSummary::Platform, |store| TrustSummary::Bundle {
                anchors: store.len(),
                skipped: store.skipped(),
            });
        Ok(Self {
            identity,
            trust,
            insecure_skip_verify: config.insecure_skip_verify(),
        })
    }
}

impl IdentitySummary {
    fn from_identity(identity: &ClientIdentity) -> Result<Self> {
        let (_, cert) = parse_x509_certificate(identity.leaf().as_ref())
            .map_err(|e| anyhow!("Failed to parse client certificate: {e}"))?;
        Ok(Self {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            not_after: cert.validity().not_after.to_string(),
            currently_valid: cert.validity().is_valid(),
            chain_len: identity.cert_chain().len(),
        })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identity {
            Some(id) => {
                writeln!(f, "client identity: {} (chain of {})", id.subject, id.chain_len)?;
                writeln!(f, "  issuer:        {}", id.issuer)?;
                let state = if id.currently_valid { "" } else { " (NOT currently valid)" };
                writeln!(f, "  not after:     {}{state}", id.not_after)?;
            }
            None => writeln!(f, "client identity: none")?,
        }
        match self.trust {
            TrustSummary::Platform => writeln!(f, "server trust:    platform roots")?,
            TrustSummary::Bundle { anchors, skipped } => writeln!(
                f,
                "server trust:    CA bundle, {anchors} anchor(s), {skipped} block(s) skipped"
            )?,
        }
        if self.insecure_skip_verify {
            writeln!(f, "verification:    DISABLED (insecure_skip_verify)")
        } else {
            writeln!(f, "verification:    enabled")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use mqtls_crypto::certs::{generate_ca, generate_client_cert};

    use super::*;

    #[test]
    fn flags_override_settings() {
        let mut settings = TlsSettings {
            client_cert: Some(PathBuf::from("/from/file.pem")),
            ca_cert: Some(PathBuf::from("/from/ca.pem")),
            ..TlsSettings::default()
        };
        let args = CheckArgs {
            client_cert: Some(PathBuf::from("/from/flag.pem")),
            key_passphrase: Some("pw".to_string()),
            insecure_skip_verify: true,
            ..CheckArgs::default()
        };
        args.apply(&mut settings);

        assert_eq!(settings.client_cert, Some(PathBuf::from("/from/flag.pem")));
        assert_eq!(settings.ca_cert, Some(PathBuf::from("/from/ca.pem")));
        assert_eq!(settings.key_passphrase.as_bytes(), b"pw");
        assert!(settings.insecure_skip_verify);
    }

    #[test]
    fn absent_flags_keep_settings() {
        let mut settings = TlsSettings {
            insecure_skip_verify: true,
            key_passphrase: Passphrase::from("from-env"),
            ..TlsSettings::default()
        };
        let before = settings.clone();
        CheckArgs::default().apply(&mut settings);
        assert_eq!(settings, before);
    }

    #[test]
    fn report_for_plain_tls() {
        let report = run(&TlsSettings {
            insecure_skip_verify: true,
            ..TlsSettings::default()
        })
        .unwrap();
        assert!(report.identity.is_none());
        assert_eq!(report.trust, TrustSummary::Platform);

        let text = report.to_string();
        assert!(text.contains("client identity: none"));
        assert!(text.contains("DISABLED"));
    }

    #[test]
    fn report_for_mutual_tls() {
        let dir = tempfile::tempdir().unwrap();
        let ca = generate_ca("mqtls Check").unwrap();
        let bundle = generate_client_cert(&ca, "check-client").unwrap();
        let cert = dir.path().join("client.pem");
        let key = dir.path().join("client-key.pem");
        let ca_path = dir.path().join("ca.pem");
        std::fs::write(&cert, &bundle.cert_pem).unwrap();
        std::fs::write(&key, &bundle.key_pem).unwrap();
        std::fs::write(&ca_path, &bundle.ca_cert_pem).unwrap();

        let report = run(&TlsSettings {
            client_cert: Some(cert),
            client_key: Some(key),
            ca_cert: Some(ca_path),
            ..TlsSettings::default()
        })
        .unwrap();

        let id = report.identity.as_ref().expect("identity");
        assert!(id.subject.contains("check-client"), "{}", id.subject);
        assert!(id.issuer.contains("mqtls Check CA"), "{}", id.issuer);
        assert!(id.currently_valid);
        assert_eq!(id.chain_len, 1);
        assert_eq!(report.trust, TrustSummary::Bundle { anchors: 1, skipped: 0 });
        assert!(report.to_string().contains("verification:    enabled"));
    }

    #[test]
    fn failure_keeps_the_error_chain() {
        let err = run(&TlsSettings {
            ca_cert: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..TlsSettings::default()
        })
        .unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.starts_with("Failed to build TLS configuration"));
        assert!(chain.contains("/nonexistent/ca.pem"));
    }
}
