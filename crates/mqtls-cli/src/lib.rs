//! `mqtls` command-line tool
//!
//! - `check`: build the client TLS configuration and print a summary
//! - `gen-dev-certs`: write a development CA, client certificate and key

pub mod check;
pub mod dev_certs;
