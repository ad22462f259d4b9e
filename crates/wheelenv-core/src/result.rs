//! Outcome of a provisioning run

use crate::error::ProvisionError;
use serde::Serialize;
use std::collections::BTreeSet;

/// Stage of the provisioning workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Lock,
    Isolate,
    Activate,
    Install,
    Verify,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Lock => "lock",
            Self::Isolate => "isolate",
            Self::Activate => "activate",
            Self::Install => "install",
            Self::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// How a tool ended up in the environment during this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolAction {
    /// The installer ran for it in this run.
    Installed,
    /// A previous run's install was still in place.
    Reused,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledTool {
    pub name: String,
    pub version: String,
    pub action: ToolAction,
}

impl InstalledTool {
    pub fn installed(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            action: ToolAction::Installed,
        }
    }

    pub fn reused(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            action: ToolAction::Reused,
        }
    }
}

/// The step that failed and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub step: Step,
    pub error: ProvisionError,
}

impl Failure {
    pub fn new(step: Step, error: ProvisionError) -> Self {
        Self { step, error }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} step failed: {}", self.step, self.error)?;
        let diagnostics = self.error.diagnostics().trim_end();
        if !diagnostics.is_empty() {
            write!(f, "\n{}", diagnostics)?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {}

/// Result of one [`crate::Provisioner::provision`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningResult {
    pub success: bool,
    /// Tools present in the environment by the time the run ended, in
    /// declared order.
    pub installed_tools: Vec<InstalledTool>,
    pub failure: Option<Failure>,
}

impl ProvisioningResult {
    pub fn succeeded(installed_tools: Vec<InstalledTool>) -> Self {
        Self {
            success: true,
            installed_tools,
            failure: None,
        }
    }

    pub fn failed(installed_tools: Vec<InstalledTool>, failure: Failure) -> Self {
        Self {
            success: false,
            installed_tools,
            failure: Some(failure),
        }
    }

    /// Names of all tools in [`ProvisioningResult::installed_tools`].
    pub fn installed_names(&self) -> BTreeSet<String> {
        self.installed_tools.iter().map(|t| t.name.clone()).collect()
    }

    /// Tools the installer actually ran for in this run.
    pub fn newly_installed(&self) -> impl Iterator<Item = &InstalledTool> {
        self.installed_tools
            .iter()
            .filter(|t| t.action == ToolAction::Installed)
    }

    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.installed_tools
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.version.as_str())
    }

    /// Convert into a `Result` for callers that prefer `?`.
    pub fn into_result(self) -> Result<Vec<InstalledTool>, Failure> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.installed_tools),
        }
    }
}
