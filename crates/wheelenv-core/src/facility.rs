//! Contracts for the external isolation and installation facilities

use crate::error::FacilityError;
use crate::spec::ToolRequirement;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::Command;
use wheelenv_fs::NormalizedPath;

/// Location of an isolated environment and its interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentHandle {
    pub root: NormalizedPath,
    /// Directory holding the environment's executables.
    pub bin_dir: NormalizedPath,
    pub interpreter: NormalizedPath,
}

impl EnvironmentHandle {
    /// The standard virtual environment layout for the host platform.
    ///
    /// `bin/python` on Unix, `Scripts/python.exe` on Windows.
    pub fn venv_layout(root: &NormalizedPath) -> Self {
        let (bin, interpreter) = if cfg!(windows) {
            ("Scripts", "python.exe")
        } else {
            ("bin", "python")
        };
        let bin_dir = root.join(bin);
        Self {
            root: root.clone(),
            interpreter: bin_dir.join(interpreter),
            bin_dir,
        }
    }
}

/// An environment bound for use by child processes.
///
/// Activation never touches the calling process. It is a set of variable
/// overrides applied to every command built through [`ActiveEnvironment::command`].
#[derive(Debug, Clone)]
pub struct ActiveEnvironment {
    handle: EnvironmentHandle,
    set_vars: Vec<(String, OsString)>,
    unset_vars: Vec<String>,
}

impl ActiveEnvironment {
    pub fn new(handle: EnvironmentHandle) -> Self {
        Self {
            handle,
            set_vars: Vec::new(),
            unset_vars: Vec::new(),
        }
    }

    /// Override `key` for child processes.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        let key = key.into();
        self.unset_vars.retain(|k| k != &key);
        self.set_vars.retain(|(k, _)| k != &key);
        self.set_vars.push((key, value.into()));
        self
    }

    /// Remove `key` from child processes' environment.
    pub fn without_var(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.set_vars.retain(|(k, _)| k != &key);
        self.unset_vars.push(key);
        self
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.handle.root
    }

    /// Value a child process will see for `key`, if overridden.
    pub fn var(&self, key: &str) -> Option<&OsStr> {
        self.set_vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// Whether `key` is removed for child processes.
    pub fn is_unset(&self, key: &str) -> bool {
        self.unset_vars.iter().any(|k| k == key)
    }

    /// Path of an executable inside the environment's bin directory.
    pub fn executable(&self, name: &str) -> PathBuf {
        let file = if cfg!(windows) {
            format!("{}.exe", name)
        } else {
            name.to_string()
        };
        self.handle.bin_dir.join(&file).to_native()
    }

    /// A command for `program` with the activation applied.
    pub fn command(&self, program: impl AsRef<OsStr>) -> Command {
        let mut cmd = Command::new(program);
        for key in &self.unset_vars {
            cmd.env_remove(key);
        }
        for (key, value) in &self.set_vars {
            cmd.env(key, value);
        }
        cmd.current_dir(self.handle.root.to_native());
        cmd
    }

    /// A command running the environment's interpreter.
    pub fn interpreter_command(&self) -> Command {
        self.command(self.handle.interpreter.to_native())
    }
}

/// What the installation facility reported for one install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Version that landed, when the facility knows it.
    pub version: Option<String>,
    /// Exit code of the installer; `None` when killed by a signal.
    pub exit_code: Option<i32>,
    /// Combined installer output.
    pub log: String,
}

impl InstallOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Creates and activates isolated interpreter environments.
pub trait IsolationFacility: Send + Sync {
    /// Whether an environment already exists at `root`.
    fn exists(&self, root: &NormalizedPath) -> bool;

    /// Create a fresh environment at `root`.
    fn create(&self, root: &NormalizedPath) -> Result<EnvironmentHandle, FacilityError>;

    /// Handle for the environment already present at `root`.
    fn open(&self, root: &NormalizedPath) -> Result<EnvironmentHandle, FacilityError>;

    /// Whether `name`, an entry directly under a root, is something an
    /// interrupted [`IsolationFacility::create`] may have left behind.
    ///
    /// A root holding only such entries is created over, not refused.
    fn owns_entry(&self, name: &str) -> bool;

    /// Bind an environment for subsequent installs.
    ///
    /// Every successful call is paired with [`IsolationFacility::deactivate`];
    /// use [`crate::ActivationGuard`] rather than calling these directly.
    fn activate(&self, handle: &EnvironmentHandle) -> Result<ActiveEnvironment, FacilityError>;

    /// Undo whatever [`IsolationFacility::activate`] set up.
    fn deactivate(&self, active: &ActiveEnvironment);
}

/// Installs packages into an activated environment.
pub trait InstallFacility: Send + Sync {
    /// Version of `name` currently installed, or `None` if absent.
    fn installed_version(
        &self,
        env: &ActiveEnvironment,
        name: &str,
    ) -> Result<Option<String>, FacilityError>;

    /// Install `tool`, honoring its version constraint.
    ///
    /// `Err` means the installer could not be run at all; a run that fails
    /// is an `Ok` outcome with a non-zero exit code.
    fn install(
        &self,
        env: &ActiveEnvironment,
        tool: &ToolRequirement,
    ) -> Result<InstallOutcome, FacilityError>;

    /// Confirm the tool's entry point runs from the environment.
    ///
    /// Returns the first line the tool printed, typically its version banner.
    fn verify(&self, env: &ActiveEnvironment, tool: &ToolRequirement)
    -> Result<String, FacilityError>;
}
