//! wheelenv CLI
//!
//! Provisions the isolated build environment for native-extension wheels.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use wheelenv_core::{PipFacility, ProvisionConfig, Provisioner, VenvFacility};
use wheelenv_fs::NormalizedPath;

use cli::Cli;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir()?;
    let config = resolve_config(&cli)?;
    let spec = config.to_spec(&cwd)?;
    tracing::debug!(root = %spec.root(), tools = spec.tools().len(), "resolved spec");

    let mut isolation = VenvFacility::new();
    if let Some(python) = &config.python {
        isolation = isolation.with_python(python);
    }
    let mut installer = PipFacility::new();
    if let Some(url) = &config.index_url {
        installer = installer.with_index_url(url);
    }
    let provisioner = Provisioner::new(isolation, installer);

    if cli.check {
        commands::run_check(&provisioner, &spec, cli.json)
    } else {
        commands::run_provision(&provisioner, &spec, cli.json)
    }
}

/// Logs go to stderr so `--json` output stays machine-readable.
///
/// `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
}

/// The built-in spec, or the config file, with command-line overrides applied.
fn resolve_config(cli: &Cli) -> Result<ProvisionConfig> {
    let mut config = match &cli.config {
        Some(path) => ProvisionConfig::load(&NormalizedPath::new(path))?,
        None => ProvisionConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root = NormalizedPath::new(root).to_string();
    }
    if cli.fresh {
        config.reuse_existing = false;
    }
    if let Some(python) = &cli.python {
        config.python = Some(python.clone());
    }
    if let Some(url) = &cli.index_url {
        config.index_url = Some(url.clone());
    }
    Ok(config)
}
