//! `mqtls` Core Library
//!
//! Shared functionality for `mqtls` components:
//! - Settings resolution (files, environment)
//! - Common error types
//! - Tracing initialisation

pub mod config;
pub mod error;
pub mod tracing_init;

pub use config::{Config, LogSettings, TlsSettings};
pub use error::{Error, Result};
