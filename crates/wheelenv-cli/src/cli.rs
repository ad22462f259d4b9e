//! CLI argument parsing using clap derive

use clap::Parser;
use std::path::PathBuf;

/// Provision an isolated Python environment with the tools needed to build
/// and repair native-extension wheels.
///
/// With no arguments, creates (or reuses) ./.venv and installs maturin and
/// patchelf into it.
#[derive(Parser, Debug)]
#[command(name = "wheelenv")]
#[command(author, version, about, long_about)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Load the environment spec from a TOML or JSON file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Environment root (overrides the spec's root)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Fail instead of reusing an existing environment
    #[arg(long)]
    pub fresh: bool,

    /// Interpreter used to create the environment
    #[arg(long, value_name = "LAUNCHER", env = "WHEELENV_PYTHON")]
    pub python: Option<String>,

    /// Package index to install from
    #[arg(long, value_name = "URL")]
    pub index_url: Option<String>,

    /// Report the environment's state without changing anything
    #[arg(long)]
    pub check: bool,

    /// Print the result as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
