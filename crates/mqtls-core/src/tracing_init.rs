//! Shared tracing/logging initialisation.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogSettings;

/// Build the default filter directive: `level` for the given binary target
/// and for the `mqtls` libraries it drives.
pub fn default_directive(target: &str, level: &str) -> String {
    format!("{target}={level},mqtls_core={level},mqtls_crypto={level},mqtls_tls={level}")
}

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set. With `log.json` the
/// subscriber emits structured JSON lines instead of the human-readable
/// format.
pub fn init_tracing(target: &str, log: &LogSettings) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_directive(target, &log.level)),
    );
    if log.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_covers_libraries() {
        let d = default_directive("mqtls", "debug");
        assert!(d.starts_with("mqtls=debug"));
        assert!(d.contains("mqtls_tls=debug"));
        assert!(d.contains("mqtls_crypto=debug"));
    }
}
