//! `mqtls gen-dev-certs`: throwaway CA and client certificate for local
//! brokers. NOT for production use.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use mqtls_crypto::LegacyCipher;

const CLIENT_CERT_FILENAME: &str = "client.pem";
const CLIENT_KEY_FILENAME: &str = "client-key.pem";
const CA_CERT_FILENAME: &str = "ca.pem";

#[derive(Debug, Args)]
pub struct GenDevCertsArgs {
    /// Directory to write the PEM files to (created if missing)
    #[arg(long)]
    pub dir: PathBuf,

    /// Common Name of the client certificate
    #[arg(long, default_value = "mqtls-dev-client")]
    pub name: String,

    /// Encrypt the client key with this passphrase (legacy PEM encryption)
    #[arg(long)]
    pub passphrase: Option<String>,

    /// Cipher for the encrypted key; ignored without --passphrase
    #[arg(long, default_value = "AES-256-CBC")]
    pub cipher: LegacyCipher,
}

/// Paths to the generated files.
#[derive(Debug, Clone)]
pub struct CertPaths {
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
    pub ca_cert: PathBuf,
}

impl CertPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            client_cert: dir.join(CLIENT_CERT_FILENAME),
            client_key: dir.join(CLIENT_KEY_FILENAME),
            ca_cert: dir.join(CA_CERT_FILENAME),
        }
    }
}

/// Generate a CA and a client certificate signed by it, and write both plus
/// the client key into `args.dir`. Existing files are overwritten.
pub fn generate(args: &GenDevCertsArgs) -> Result<CertPaths> {
    fs::create_dir_all(&args.dir)
        .with_context(|| format!("Failed to create directory: {}", args.dir.display()))?;

    let encrypt_with = args.passphrase.as_deref().filter(|p| !p.is_empty());
    tracing::info!(
        dir = %args.dir.display(),
        client = %args.name,
        encrypted = encrypt_with.is_some(),
        "Generating development certificates"
    );

    let ca = mqtls_crypto::certs::generate_ca("mqtls Dev")
        .map_err(|e| anyhow::anyhow!("CA generation failed: {e}"))?;
    let bundle = mqtls_crypto::certs::generate_client_cert(&ca, &args.name)
        .map_err(|e| anyhow::anyhow!("Client cert generation failed: {e}"))?;

    let key_pem = match encrypt_with {
        Some(passphrase) => bundle
            .encrypted_key_pem(passphrase.as_bytes(), args.cipher)
            .context("Failed to encrypt client key")?,
        None => bundle.key_pem.clone(),
    };

    let paths = CertPaths::in_dir(&args.dir);
    write_pem_file(&paths.client_cert, &bundle.cert_pem, "client certificate")?;
    write_pem_file(&paths.client_key, &key_pem, "client key")?;
    write_pem_file(&paths.ca_cert, &bundle.ca_cert_pem, "CA certificate")?;

    #[cfg(unix)]
    restrict_key_permissions(&paths.client_key)?;

    tracing::info!(
        client_cert = %paths.client_cert.display(),
        client_key = %paths.client_key.display(),
        ca_cert = %paths.ca_cert.display(),
        "Development certificates written"
    );
    Ok(paths)
}

fn write_pem_file(path: &Path, content: &str, description: &str) -> Result<()> {
    fs::write(path, content)
        .with_context(|| format!("Failed to write {description}: {}", path.display()))
}

/// Owner-only read/write (0600).
#[cfg(unix)]
fn restrict_key_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}
