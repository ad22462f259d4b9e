//! Error types for wheelenv-core

use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building specs or loading configuration.
///
/// Provisioning itself never returns these; a run reports its outcome via
/// [`crate::ProvisioningResult`] and [`ProvisionError`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] wheelenv_fs::Error),

    #[error("Invalid environment spec: {message}")]
    InvalidSpec { message: String },

    #[error("Invalid tool name '{name}': {reason}")]
    InvalidToolName { name: String, reason: String },

    #[error("Invalid version constraint '{constraint}' for '{tool}'")]
    InvalidConstraint { tool: String, constraint: String },

    #[error("Tool '{name}' is listed more than once")]
    DuplicateTool { name: String },
}

/// Why a provisioning run failed.
///
/// Each variant carries the facility output verbatim so the caller can
/// show the operator exactly what the underlying tool said.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProvisionError {
    #[error("environment creation failed at {path}: {message}")]
    EnvironmentCreationFailed {
        path: String,
        message: String,
        diagnostics: String,
    },

    #[error("activation failed for {path}: {message}")]
    ActivationFailed {
        path: String,
        message: String,
        diagnostics: String,
    },

    #[error("installing '{tool}' failed ({})", exit_label(.exit_code))]
    ToolInstallFailed {
        tool: String,
        exit_code: Option<i32>,
        log: String,
    },

    #[error("'{tool}' is not invocable from the environment: {message}")]
    ToolVerificationFailed {
        tool: String,
        message: String,
        diagnostics: String,
    },

    #[error("another provisioning run is already in progress for {path}")]
    ConcurrentProvisioningDetected { path: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "installer could not be run".to_string(),
    }
}

impl ProvisionError {
    /// The tool the failure concerns, if any.
    pub fn tool(&self) -> Option<&str> {
        match self {
            Self::ToolInstallFailed { tool, .. } | Self::ToolVerificationFailed { tool, .. } => {
                Some(tool)
            }
            _ => None,
        }
    }

    /// Raw facility output attached to the failure.
    pub fn diagnostics(&self) -> &str {
        match self {
            Self::EnvironmentCreationFailed { diagnostics, .. }
            | Self::ActivationFailed { diagnostics, .. }
            | Self::ToolVerificationFailed { diagnostics, .. } => diagnostics,
            Self::ToolInstallFailed { log, .. } => log,
            Self::ConcurrentProvisioningDetected { .. } => "",
        }
    }
}

/// Failure reported by an isolation or installation facility.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FacilityError {
    pub message: String,
    /// Captured stdout/stderr of the failed command, possibly empty.
    pub diagnostics: String,
}

impl FacilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            diagnostics: String::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        self.diagnostics = diagnostics.into();
        self
    }

    /// Message and diagnostics joined for places that only keep one string.
    pub fn to_report(&self) -> String {
        if self.diagnostics.is_empty() {
            self.message.clone()
        } else {
            format!("{}\n{}", self.message, self.diagnostics)
        }
    }
}
