//! [`TestWorkspace`] fixture for provisioning scenarios.

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wheelenv_core::{EnvironmentSpec, ToolRequirement};
use wheelenv_fs::NormalizedPath;

/// A temporary working directory with an environment root inside it.
///
/// # Example
///
/// ```rust,no_run
/// use wheelenv_test_utils::TestWorkspace;
///
/// let ws = TestWorkspace::new();
/// let spec = ws.spec(&[("builder", Some("1.2")), ("patchelf", None)]);
/// assert!(spec.root().as_str().ends_with(".venv"));
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("TestWorkspace::new: failed to create temp dir"),
        }
    }

    /// The working directory.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The default environment root, `<dir>/.venv`.
    pub fn root(&self) -> NormalizedPath {
        self.root_named(".venv")
    }

    pub fn root_named(&self, name: &str) -> NormalizedPath {
        NormalizedPath::new(self.dir()).join(name)
    }

    /// Spec for `<dir>/.venv` with `(name, constraint)` tools.
    pub fn spec(&self, tools: &[(&str, Option<&str>)]) -> EnvironmentSpec {
        self.spec_at(&self.root(), tools)
    }

    pub fn spec_at(&self, root: &NormalizedPath, tools: &[(&str, Option<&str>)]) -> EnvironmentSpec {
        let tools = tools
            .iter()
            .map(|(name, constraint)| match constraint {
                Some(c) => ToolRequirement::pinned(*name, c),
                None => ToolRequirement::new(*name),
            })
            .collect::<Result<Vec<_>, _>>()
            .expect("TestWorkspace::spec: invalid tool");
        EnvironmentSpec::new(root.clone(), tools).expect("TestWorkspace::spec: invalid spec")
    }

    /// Write a file relative to the working directory.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.dir().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("TestWorkspace::write: mkdir failed");
        }
        fs::write(&path, content).expect("TestWorkspace::write: write failed");
    }

    /// Names of the entries directly under `root`, sorted.
    pub fn entries(&self, root: &NormalizedPath) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(root.to_native())
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
