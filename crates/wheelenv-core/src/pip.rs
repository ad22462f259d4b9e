//! pip as the package-installation facility

use crate::error::FacilityError;
use crate::facility::{ActiveEnvironment, InstallFacility, InstallOutcome};
use crate::spec::ToolRequirement;
use crate::venv::combined_output;
use std::process::Command;
use tracing::{debug, warn};

/// Installs tools with the environment interpreter's `python -m pip`.
#[derive(Debug, Clone, Default)]
pub struct PipFacility {
    index_url: Option<String>,
}

impl PipFacility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install from `url` instead of the default package index.
    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = Some(url.into());
        self
    }

    pub fn index_url(&self) -> Option<&str> {
        self.index_url.as_deref()
    }

    fn pip(&self, env: &ActiveEnvironment, subcommand: &str) -> Command {
        let mut cmd = env.interpreter_command();
        cmd.args([
            "-m",
            "pip",
            subcommand,
            "--disable-pip-version-check",
            "--no-input",
        ]);
        cmd
    }

    /// Arguments after `pip install` for `tool`.
    fn install_args(&self, tool: &ToolRequirement) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(url) = &self.index_url {
            args.push("--index-url".to_string());
            args.push(url.clone());
        }
        args.push(tool.requirement_string());
        args
    }
}

/// Extract the `Version:` field from `pip show` output.
fn parse_show_version(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let value = line.strip_prefix("Version:")?.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

impl InstallFacility for PipFacility {
    fn installed_version(
        &self,
        env: &ActiveEnvironment,
        name: &str,
    ) -> Result<Option<String>, FacilityError> {
        let output = self
            .pip(env, "show")
            .arg(name)
            .output()
            .map_err(|e| FacilityError::new(format!("failed to run pip show: {}", e)))?;

        // pip show exits non-zero when the package is absent
        if !output.status.success() {
            return Ok(None);
        }
        Ok(parse_show_version(&String::from_utf8_lossy(&output.stdout)))
    }

    fn install(
        &self,
        env: &ActiveEnvironment,
        tool: &ToolRequirement,
    ) -> Result<InstallOutcome, FacilityError> {
        let args = self.install_args(tool);
        debug!(root = %env.root(), ?args, "running pip install");

        let output = self
            .pip(env, "install")
            .args(&args)
            .output()
            .map_err(|e| FacilityError::new(format!("failed to run pip install: {}", e)))?;

        let log = combined_output(&output);
        if !output.status.success() {
            return Ok(InstallOutcome {
                version: None,
                exit_code: output.status.code(),
                log,
            });
        }

        // The install itself succeeded; an unknown version is for the
        // caller to judge, not an install failure
        let version = match self.installed_version(env, tool.name()) {
            Ok(version) => version,
            Err(e) => {
                warn!(tool = tool.name(), error = %e, "installed, but the version query failed");
                None
            }
        };
        Ok(InstallOutcome {
            version,
            exit_code: output.status.code(),
            log,
        })
    }

    fn verify(
        &self,
        env: &ActiveEnvironment,
        tool: &ToolRequirement,
    ) -> Result<String, FacilityError> {
        let executable = env.executable(tool.entry_point());
        if !executable.is_file() {
            return Err(FacilityError::new(format!(
                "entry point {} does not exist",
                executable.display()
            )));
        }

        let output = env
            .command(&executable)
            .arg("--version")
            .output()
            .map_err(|e| FacilityError::new(format!("failed to run {}: {}", executable.display(), e)))?;
        if !output.status.success() {
            return Err(FacilityError::new(format!(
                "'{} --version' exited with {}",
                tool.entry_point(),
                output.status
            ))
            .with_diagnostics(combined_output(&output)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }
}
