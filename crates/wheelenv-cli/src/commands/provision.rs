//! Provision command implementation

use colored::Colorize;
use wheelenv_core::{
    EnvironmentSpec, InstallFacility, IsolationFacility, ProvisioningResult, Provisioner,
    ToolAction,
};

use crate::error::{CliError, Result};

/// Run provisioning and report the outcome.
///
/// A failed run is returned as [`CliError::Provision`] so `main` prints the
/// step, tool and facility output to stderr before exiting non-zero.
pub fn run_provision<I: IsolationFacility, P: InstallFacility>(
    provisioner: &Provisioner<I, P>,
    spec: &EnvironmentSpec,
    json: bool,
) -> Result<()> {
    let result = provisioner.provision(spec);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(spec, &result);
    }

    match result.failure {
        Some(failure) => Err(CliError::Provision(failure)),
        None => Ok(()),
    }
}

fn print_summary(spec: &EnvironmentSpec, result: &ProvisioningResult) {
    for tool in &result.installed_tools {
        let action = match tool.action {
            ToolAction::Installed => "installed".green(),
            ToolAction::Reused => "up to date".dimmed(),
        };
        println!("  {} {} {} ({})", "+".green(), tool.name.cyan(), tool.version, action);
    }
    if result.success {
        println!(
            "{} {}",
            "Environment ready:".green().bold(),
            spec.root()
        );
    }
}
