//! Check command implementation

use colored::Colorize;
use wheelenv_core::{
    EnvironmentSpec, EnvironmentStatus, InstallFacility, IsolationFacility, Provisioner,
};

use crate::error::{CliError, Result};

/// Report whether `spec` is already satisfied, without changing anything.
pub fn run_check<I: IsolationFacility, P: InstallFacility>(
    provisioner: &Provisioner<I, P>,
    spec: &EnvironmentSpec,
    json: bool,
) -> Result<()> {
    let status = provisioner.inspect(spec);

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }

    if status.is_ready() {
        return Ok(());
    }
    let message = if status.in_progress {
        format!("provisioning of {} is in progress", status.root)
    } else if !status.environment_present {
        format!("{} is not provisioned: no environment", status.root)
    } else {
        let pending: Vec<&str> = status.pending().map(|t| t.name.as_str()).collect();
        format!(
            "{} is not provisioned: missing {}",
            status.root,
            pending.join(", ")
        )
    };
    Err(CliError::NotReady { message })
}

fn print_status(status: &EnvironmentStatus) {
    println!("{}", "Environment Status".bold());
    println!();
    println!("{}:   {}", "Root".dimmed(), status.root);
    let present = if status.environment_present {
        "present".green()
    } else {
        "missing".yellow()
    };
    println!("{}:   {}", "Env".dimmed(), present);
    println!();

    println!("{}:", "Tools".bold());
    for tool in &status.tools {
        let requested = tool.constraint.as_deref().unwrap_or("any version");
        match (&tool.recorded_version, tool.constraint_matches) {
            (Some(version), true) => {
                println!("  {} {} {} ({})", "+".green(), tool.name.cyan(), version, requested)
            }
            (Some(version), false) => println!(
                "  {} {} {} ({} requested)",
                "~".yellow(),
                tool.name.cyan(),
                version,
                requested
            ),
            (None, _) => println!(
                "  {} {} ({})",
                "-".red(),
                tool.name.cyan(),
                "not installed".yellow()
            ),
        }
    }

    if status.is_ready() {
        println!();
        println!("{}", "ready".green().bold());
    }
}
