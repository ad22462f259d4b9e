//! Error types for wheelenv-cli

use wheelenv_core::Failure;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that end the CLI with a non-zero exit code
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Invalid spec or configuration
    #[error(transparent)]
    Core(#[from] wheelenv_core::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A provisioning run failed; carries the step, tool and facility output
    #[error("{0}")]
    Provision(#[from] Failure),

    /// `--check` found work left to do
    #[error("{message}")]
    NotReady { message: String },
}
