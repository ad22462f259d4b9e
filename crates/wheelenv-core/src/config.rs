//! Provisioning configuration file
//!
//! The CLI provisions a built-in spec unless a config file replaces it:
//!
//! ```toml
//! root = ".venv"
//! reuse_existing = true
//! python = "python3"
//!
//! [[tools]]
//! name = "maturin"
//! version = ">=1.4,<2"
//!
//! [[tools]]
//! name = "patchelf"
//! ```

use crate::error::Result;
use crate::spec::{EnvironmentSpec, ToolRequirement};
use serde::{Deserialize, Serialize};
use std::path::Path;
use wheelenv_fs::{ConfigStore, NormalizedPath};

fn default_root() -> String {
    ".venv".to_string()
}

fn default_true() -> bool {
    true
}

/// One `[[tools]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
}

impl ToolEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            entry_point: None,
        }
    }

    pub fn to_requirement(&self) -> Result<ToolRequirement> {
        let tool = match &self.version {
            Some(version) => ToolRequirement::pinned(&self.name, version)?,
            None => ToolRequirement::new(&self.name)?,
        };
        match &self.entry_point {
            Some(entry_point) => tool.with_entry_point(entry_point),
            None => Ok(tool),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisionConfig {
    /// Environment root, relative to the working directory unless absolute.
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default = "default_true")]
    pub reuse_existing: bool,
    /// Interpreter launcher used to create the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
    /// Package index for installs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_url: Option<String>,
    #[serde(default)]
    pub tools: Vec<ToolEntry>,
}

impl Default for ProvisionConfig {
    /// The built-in wheel toolchain: `maturin` and `patchelf` in `./.venv`.
    fn default() -> Self {
        Self {
            root: default_root(),
            reuse_existing: true,
            python: None,
            index_url: None,
            tools: vec![ToolEntry::named("maturin"), ToolEntry::named("patchelf")],
        }
    }
}

impl ProvisionConfig {
    /// Load a `.toml` or `.json` config file.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        Ok(ConfigStore::new().load(path)?)
    }

    /// Build the spec, resolving a relative root against `base`.
    pub fn to_spec(&self, base: &Path) -> Result<EnvironmentSpec> {
        let tools = self
            .tools
            .iter()
            .map(ToolEntry::to_requirement)
            .collect::<Result<Vec<_>>>()?;
        Ok(EnvironmentSpec::resolved(self.root.as_str(), base, tools)?
            .with_reuse_existing(self.reuse_existing))
    }
}
