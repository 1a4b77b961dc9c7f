use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use mqtls_cli::check::{self, CheckArgs};
use mqtls_cli::dev_certs::{self, GenDevCertsArgs};

/// Client TLS settings for mqtls message queue clients.
#[derive(Debug, Parser)]
#[command(name = "mqtls", version, about)]
struct Cli {
    /// Settings file applied after the global and project settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation)
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the TLS configuration and report what it contains
    Check(CheckArgs),
    /// Write a development CA, client certificate and key
    GenDevCerts(GenDevCertsArgs),
}

#[allow(clippy::print_stdout)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let project_dir = std::env::current_dir().ok();
    let mut config = mqtls_core::config::load_config(project_dir.as_deref(), cli.config.as_deref())?;
    if cli.log_json {
        config.log.json = true;
    }
    mqtls_core::tracing_init::init_tracing("mqtls_cli", &config.log);

    match cli.command {
        Commands::Check(ref args) => {
            args.apply(&mut config.tls);
            let report = check::run(&config.tls)?;
            print!("{report}");
        }
        Commands::GenDevCerts(ref args) => {
            let paths = dev_certs::generate(args)?;
            println!("Development certificates written (NOT for production):");
            println!("  Client cert: {}", paths.client_cert.display());
            println!("  Client key:  {}", paths.client_key.display());
            println!("  CA cert:     {}", paths.ca_cert.display());
        }
    }

    Ok(())
}
