//! Configuration resolution for mqtls.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`<config dir>/mqtls/settings.json`)
//! 3. Project config (`.mqtls/settings.json`)
//! 4. Explicit config file (`--config`)
//! 5. Environment variables
//!
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use mqtls_crypto::Passphrase;
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

pub const ENV_CLIENT_CERT: &str = "MQTLS_CLIENT_CERT";
pub const ENV_CLIENT_KEY: &str = "MQTLS_CLIENT_KEY";
pub const ENV_CA_CERT: &str = "MQTLS_CA_CERT";
pub const ENV_KEY_PASSPHRASE: &str = "MQTLS_KEY_PASSPHRASE";
pub const ENV_INSECURE_SKIP_VERIFY: &str = "MQTLS_INSECURE_SKIP_VERIFY";
pub const ENV_LOG_LEVEL: &str = "MQTLS_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "MQTLS_LOG_JSON";

/// Complete mqtls configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub tls: TlsSettings,
    pub log: LogSettings,
}

/// Client TLS settings, one field per builder input.
///
/// Paths are optional independently; an empty string in a settings file or
/// environment variable means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub ca_cert: Option<PathBuf>,
    pub key_passphrase: Passphrase,
    /// Disables server certificate verification. Development only.
    pub insecure_skip_verify: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// One settings file. Every field is optional so a file only overrides
/// what it mentions.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    tls: TlsFile,
    log: LogFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TlsFile {
    #[serde(deserialize_with = "non_empty_path")]
    client_cert: Option<PathBuf>,
    #[serde(deserialize_with = "non_empty_path")]
    client_key: Option<PathBuf>,
    #[serde(deserialize_with = "non_empty_path")]
    ca_cert: Option<PathBuf>,
    key_passphrase: Option<Passphrase>,
    insecure_skip_verify: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LogFile {
    level: Option<String>,
    json: Option<bool>,
}

fn non_empty_path<'de, D>(deserializer: D) -> std::result::Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(path_from))
}

fn path_from(raw: String) -> Option<PathBuf> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(raw))
    }
}

/// Load configuration with hierarchical resolution from the process
/// environment.
pub fn load_config(project_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Config> {
    let global = global_config_path();
    load_config_from(global.as_deref(), project_dir, explicit, |key| {
        std::env::var(key).ok()
    })
}

/// [`load_config`] with the global settings file and the environment
/// lookup supplied by the caller. A missing global file is skipped.
pub fn load_config_from(
    global: Option<&Path>,
    project_dir: Option<&Path>,
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global
        && global_path.exists()
    {
        let file = load_config_file(global_path)?;
        merge_config(&mut config, file);
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".mqtls").join("settings.json");
        if project_path.exists() {
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    if let Some(path) = explicit {
        let file = load_config_file(path)?;
        merge_config(&mut config, file);
    }

    apply_env_overrides(&mut config, env)?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mqtls").join("settings.json"))
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: ConfigFile) {
    let ConfigFile { tls, log } = overlay;

    if tls.client_cert.is_some() {
        base.tls.client_cert = tls.client_cert;
    }
    if tls.client_key.is_some() {
        base.tls.client_key = tls.client_key;
    }
    if tls.ca_cert.is_some() {
        base.tls.ca_cert = tls.ca_cert;
    }
    if let Some(passphrase) = tls.key_passphrase {
        base.tls.key_passphrase = passphrase;
    }
    if let Some(skip) = tls.insecure_skip_verify {
        base.tls.insecure_skip_verify = skip;
    }

    if let Some(level) = log.level {
        base.log.level = level;
    }
    if let Some(json) = log.json {
        base.log.json = json;
    }
}

/// Parse a boolean environment value. Unrecognised values yield `None`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(var: &str, val: &str) -> Result<bool> {
    parse_bool(val).ok_or_else(|| {
        Error::Config(format!(
            "{var} must be one of true/false/yes/no/on/off/1/0, got {val:?}"
        ))
    })
}

fn apply_env_overrides(
    config: &mut Config,
    env: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    // An explicitly empty variable clears a path set by a file.
    if let Some(val) = env(ENV_CLIENT_CERT) {
        config.tls.client_cert = path_from(val);
    }
    if let Some(val) = env(ENV_CLIENT_KEY) {
        config.tls.client_key = path_from(val);
    }
    if let Some(val) = env(ENV_CA_CERT) {
        config.tls.ca_cert = path_from(val);
    }
    if let Some(val) = env(ENV_KEY_PASSPHRASE) {
        config.tls.key_passphrase = Passphrase::from(val);
    }
    if let Some(val) = env(ENV_INSECURE_SKIP_VERIFY).filter(|v| !v.trim().is_empty()) {
        config.tls.insecure_skip_verify = env_bool(ENV_INSECURE_SKIP_VERIFY, &val)?;
    }
    if let Some(val) = env(ENV_LOG_LEVEL) {
        config.log.level = val;
    }
    if let Some(val) = env(ENV_LOG_JSON).filter(|v| !v.trim().is_empty()) {
        config.log.json = env_bool(ENV_LOG_JSON, &val)?;
    }
    Ok(())
}
