//! Environment and tool requirement data model

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use wheelenv_fs::NormalizedPath;

/// Operators a constraint may start with; anything else is a bare version.
const CONSTRAINT_OPERATORS: [&str; 8] = ["===", "==", "~=", "!=", ">=", "<=", ">", "<"];

/// A tool that must be installed into the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolRequirement {
    name: String,
    version_constraint: Option<String>,
    entry_point: Option<String>,
}

impl ToolRequirement {
    /// A requirement accepting whatever version the index serves.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_tool_name(&name)?;
        Ok(Self {
            name,
            version_constraint: None,
            entry_point: None,
        })
    }

    /// A requirement pinned to `constraint`.
    ///
    /// A bare version (`1.2`) becomes an exact pin (`==1.2`); operator
    /// constraints such as `>=1.4,<2` are kept as written, minus whitespace.
    pub fn pinned(name: impl Into<String>, constraint: &str) -> Result<Self> {
        let mut tool = Self::new(name)?;
        tool.version_constraint = normalize_constraint(&tool.name, constraint)?;
        Ok(tool)
    }

    /// Use a different executable than the package name for verification.
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Result<Self> {
        let entry_point = entry_point.into();
        validate_tool_name(&entry_point)?;
        self.entry_point = Some(entry_point);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The package name as the index sees it: lowercased, with every run of
    /// `-`, `_` and `.` collapsed to a single `-`.
    pub fn canonical_name(&self) -> String {
        let mut canonical = String::with_capacity(self.name.len());
        let mut in_separator = false;
        for c in self.name.chars() {
            if matches!(c, '-' | '_' | '.') {
                if !in_separator {
                    canonical.push('-');
                }
                in_separator = true;
            } else {
                canonical.push(c.to_ascii_lowercase());
                in_separator = false;
            }
        }
        canonical
    }

    pub fn version_constraint(&self) -> Option<&str> {
        self.version_constraint.as_deref()
    }

    /// Executable expected in the environment once the tool is installed.
    pub fn entry_point(&self) -> &str {
        self.entry_point.as_deref().unwrap_or(&self.name)
    }

    /// The requirement as an installer argument, e.g. `maturin>=1.4,<2`.
    pub fn requirement_string(&self) -> String {
        match &self.version_constraint {
            Some(constraint) => format!("{}{}", self.name, constraint),
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Display for ToolRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.requirement_string())
    }
}

/// Validate a package or executable name.
///
/// Accepts ASCII letters, digits, `-`, `_` and `.`, starting with a letter
/// or digit.
pub fn validate_tool_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidToolName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let first = name.chars().next().ok_or_else(|| invalid("name is empty"))?;
    if !first.is_ascii_alphanumeric() {
        return Err(invalid("must start with a letter or digit"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(invalid(&format!("unexpected character '{}'", bad)));
    }
    Ok(())
}

fn normalize_constraint(tool: &str, raw: &str) -> Result<Option<String>> {
    let invalid = || Error::InvalidConstraint {
        tool: tool.to_string(),
        constraint: raw.to_string(),
    };

    let specifiers: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if specifiers.is_empty() {
        return Ok(None);
    }

    let mut normalized = Vec::with_capacity(specifiers.len());
    for specifier in &specifiers {
        let (operator, version) = match CONSTRAINT_OPERATORS
            .iter()
            .find(|op| specifier.starts_with(*op))
        {
            Some(op) => (*op, specifier[op.len()..].trim()),
            // Only a lone bare version is allowed, as an exact pin
            None if specifiers.len() == 1 => ("==", *specifier),
            None => return Err(invalid()),
        };
        let valid_version = !version.is_empty()
            && version
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '+' | '!' | '-' | '_'));
        if !valid_version {
            return Err(invalid());
        }
        normalized.push(format!("{}{}", operator, version));
    }
    Ok(Some(normalized.join(",")))
}

/// The target state of one provisioning run.
///
/// Constructed once per invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSpec {
    root: NormalizedPath,
    tools: Vec<ToolRequirement>,
    reuse_existing: bool,
}

impl EnvironmentSpec {
    /// Build a spec for an absolute `root`.
    ///
    /// Relative roots are rejected; use [`EnvironmentSpec::resolved`] to
    /// anchor them to a working directory first.
    pub fn new(root: impl Into<NormalizedPath>, tools: Vec<ToolRequirement>) -> Result<Self> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(Error::InvalidSpec {
                message: format!("environment root '{}' is not absolute", root),
            });
        }
        if root.parent().is_none() || root.as_str() == "/" {
            return Err(Error::InvalidSpec {
                message: "environment root cannot be a filesystem root".to_string(),
            });
        }
        if tools.is_empty() {
            return Err(Error::InvalidSpec {
                message: "at least one tool is required".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for tool in &tools {
            if !seen.insert(tool.canonical_name()) {
                return Err(Error::DuplicateTool {
                    name: tool.name().to_string(),
                });
            }
        }

        Ok(Self {
            root,
            tools,
            reuse_existing: true,
        })
    }

    /// Build a spec whose `root` may be relative to `base`.
    pub fn resolved(
        root: impl Into<NormalizedPath>,
        base: &Path,
        tools: Vec<ToolRequirement>,
    ) -> Result<Self> {
        Self::new(root.into().resolve_against(base), tools)
    }

    /// The built-in toolchain: `maturin` to build wheels and `patchelf` to
    /// repair their shared-library load paths, both unpinned.
    pub fn wheel_toolchain(root: impl Into<NormalizedPath>, base: &Path) -> Result<Self> {
        Self::resolved(
            root,
            base,
            vec![ToolRequirement::new("maturin")?, ToolRequirement::new("patchelf")?],
        )
    }

    /// Whether an existing environment at `root` may be reused.
    ///
    /// When false, provisioning only succeeds on a root with no environment.
    pub fn with_reuse_existing(mut self, reuse_existing: bool) -> Self {
        self.reuse_existing = reuse_existing;
        self
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn tools(&self) -> &[ToolRequirement] {
        &self.tools
    }

    pub fn reuse_existing(&self) -> bool {
        self.reuse_existing
    }
}
