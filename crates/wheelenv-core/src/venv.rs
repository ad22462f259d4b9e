//! Python built-in venv module as the isolation facility

use crate::error::FacilityError;
use crate::facility::{ActiveEnvironment, EnvironmentHandle, IsolationFacility};
use std::ffi::OsString;
use std::process::Command;
use tracing::{debug, warn};
use wheelenv_fs::NormalizedPath;

/// Creates environments with `python -m venv`, built into Python 3.3+.
///
/// Activation mirrors what the `activate` script does to a shell, but only
/// for child processes: `VIRTUAL_ENV` is set, the environment's bin
/// directory is put first on `PATH`, and `PYTHONHOME` is removed.
#[derive(Debug, Clone)]
pub struct VenvFacility {
    python: String,
    with_pip: bool,
}

impl VenvFacility {
    pub fn new() -> Self {
        Self {
            python: default_python().to_string(),
            with_pip: true,
        }
    }

    /// Use a different interpreter launcher to create environments.
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// Skip bootstrapping pip into new environments.
    pub fn without_pip(mut self) -> Self {
        self.with_pip = false;
        self
    }

    pub fn python(&self) -> &str {
        &self.python
    }
}

impl Default for VenvFacility {
    fn default() -> Self {
        Self::new()
    }
}

/// Entries `python -m venv` writes directly under the environment root.
const VENV_ENTRIES: &[&str] = &[
    "bin",
    "Scripts",
    "include",
    "Include",
    "lib",
    "Lib",
    "lib64",
    "pyvenv.cfg",
    ".gitignore",
];

fn default_python() -> &'static str {
    if cfg!(windows) { "python" } else { "python3" }
}

/// Combined stdout and stderr of a finished command.
pub(crate) fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, _) => stderr.into_owned(),
        (false, true) => stdout.into_owned(),
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr),
    }
}

impl IsolationFacility for VenvFacility {
    fn exists(&self, root: &NormalizedPath) -> bool {
        let handle = EnvironmentHandle::venv_layout(root);
        root.join("pyvenv.cfg").is_file() && handle.interpreter.exists()
    }

    fn create(&self, root: &NormalizedPath) -> Result<EnvironmentHandle, FacilityError> {
        let mut cmd = Command::new(&self.python);
        cmd.args(["-m", "venv"]);
        if !self.with_pip {
            cmd.arg("--without-pip");
        }
        cmd.arg(root.to_native());
        debug!(python = %self.python, root = %root, with_pip = self.with_pip, "running venv");

        let output = cmd.output().map_err(|e| {
            FacilityError::new(format!("failed to launch '{}': {}", self.python, e))
        })?;
        if !output.status.success() {
            return Err(
                FacilityError::new(format!("'{} -m venv' failed ({})", self.python, output.status))
                    .with_diagnostics(combined_output(&output)),
            );
        }

        if !self.exists(root) {
            return Err(FacilityError::new(
                "venv reported success but no interpreter was created",
            )
            .with_diagnostics(combined_output(&output)));
        }
        Ok(EnvironmentHandle::venv_layout(root))
    }

    fn open(&self, root: &NormalizedPath) -> Result<EnvironmentHandle, FacilityError> {
        if !self.exists(root) {
            return Err(FacilityError::new(format!("no virtual environment at {}", root)));
        }
        let handle = EnvironmentHandle::venv_layout(root);
        // A creation killed during ensurepip leaves an interpreter without pip
        if self.with_pip && !has_pip(&handle) {
            warn!(root = %root, "environment has no pip, bootstrapping it");
            ensure_pip(&handle)?;
        }
        Ok(handle)
    }

    fn owns_entry(&self, name: &str) -> bool {
        VENV_ENTRIES.contains(&name)
    }

    fn activate(&self, handle: &EnvironmentHandle) -> Result<ActiveEnvironment, FacilityError> {
        if !handle.interpreter.is_file() {
            return Err(FacilityError::new(format!(
                "environment interpreter {} is missing",
                handle.interpreter
            )));
        }

        let mut search_path = vec![handle.bin_dir.to_native()];
        if let Some(current) = std::env::var_os("PATH") {
            search_path.extend(std::env::split_paths(&current));
        }
        let path: OsString = std::env::join_paths(search_path)
            .map_err(|e| FacilityError::new(format!("cannot build PATH: {}", e)))?;

        Ok(ActiveEnvironment::new(handle.clone())
            .with_var("VIRTUAL_ENV", handle.root.to_native())
            .with_var("PATH", path)
            .without_var("PYTHONHOME"))
    }

    fn deactivate(&self, active: &ActiveEnvironment) {
        // Activation only ever lived in `active`; nothing process-wide to undo
        debug!(root = %active.root(), "venv deactivated");
    }
}

fn interpreter(handle: &EnvironmentHandle) -> Command {
    let mut cmd = Command::new(handle.interpreter.to_native());
    cmd.env_remove("PYTHONHOME");
    cmd
}

fn has_pip(handle: &EnvironmentHandle) -> bool {
    interpreter(handle)
        .args(["-m", "pip", "--version"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn ensure_pip(handle: &EnvironmentHandle) -> Result<(), FacilityError> {
    let output = interpreter(handle)
        .args(["-m", "ensurepip", "--upgrade", "--default-pip"])
        .output()
        .map_err(|e| {
            FacilityError::new(format!(
                "failed to launch {} for ensurepip: {}",
                handle.interpreter, e
            ))
        })?;
    if !output.status.success() {
        return Err(
            FacilityError::new(format!("ensurepip failed ({})", output.status))
                .with_diagnostics(combined_output(&output)),
        );
    }
    Ok(())
}
