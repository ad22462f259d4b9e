//! Read-only view of an environment's provisioning state

use serde::Serialize;
use wheelenv_fs::NormalizedPath;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub constraint: Option<String>,
    /// Version the receipt recorded, if any.
    pub recorded_version: Option<String>,
    /// Whether the recorded install used the currently requested constraint.
    pub constraint_matches: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentStatus {
    pub root: NormalizedPath,
    pub environment_present: bool,
    /// A provisioning run currently holds the root's lock.
    pub in_progress: bool,
    pub tools: Vec<ToolStatus>,
}

impl EnvironmentStatus {
    /// Environment present, no run in flight, every tool recorded as
    /// requested. Entry points are not run.
    pub fn is_ready(&self) -> bool {
        self.environment_present
            && !self.in_progress
            && self.tools.iter().all(|t| t.constraint_matches)
    }

    /// Tools that a provisioning run would have to install.
    pub fn pending(&self) -> impl Iterator<Item = &ToolStatus> {
        self.tools.iter().filter(|t| !t.constraint_matches)
    }
}
