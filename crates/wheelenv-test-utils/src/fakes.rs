//! Fake facilities for driving the provisioner without Python or a network.
//!
//! Both fakes are cheap to clone; clones share state, so a test can hand
//! one clone to a [`wheelenv_core::Provisioner`] and inspect another.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use wheelenv_core::{
    ActiveEnvironment, EnvironmentHandle, FacilityError, InstallFacility, InstallOutcome,
    IsolationFacility, ToolRequirement,
};
use wheelenv_fs::NormalizedPath;

/// Marker file whose presence means "an environment exists here".
pub const FAKE_ENV_MARKER: &str = "fake-env.cfg";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct IsolationState {
    created: Vec<NormalizedPath>,
    activations: usize,
    deactivations: usize,
    fail_create: Option<String>,
    fail_activate: Option<String>,
}

/// Isolation facility backed by a marker file on disk.
#[derive(Debug, Clone, Default)]
pub struct FakeIsolation {
    state: Arc<Mutex<IsolationState>>,
}

impl FakeIsolation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create` fails with `message`.
    pub fn failing_create(self, message: &str) -> Self {
        lock(&self.state).fail_create = Some(message.to_string());
        self
    }

    /// Every `activate` fails with `message`.
    pub fn failing_activate(self, message: &str) -> Self {
        lock(&self.state).fail_activate = Some(message.to_string());
        self
    }

    pub fn create_count(&self) -> usize {
        lock(&self.state).created.len()
    }

    pub fn activation_count(&self) -> usize {
        lock(&self.state).activations
    }

    pub fn deactivation_count(&self) -> usize {
        lock(&self.state).deactivations
    }

    /// Whether some activation has not been paired with a deactivation.
    pub fn is_active(&self) -> bool {
        let state = lock(&self.state);
        state.activations != state.deactivations
    }
}

impl IsolationFacility for FakeIsolation {
    fn exists(&self, root: &NormalizedPath) -> bool {
        root.join(FAKE_ENV_MARKER).is_file()
    }

    fn create(&self, root: &NormalizedPath) -> Result<EnvironmentHandle, FacilityError> {
        let mut state = lock(&self.state);
        if let Some(message) = &state.fail_create {
            return Err(FacilityError::new(message.clone()).with_diagnostics("fake create output"));
        }
        let handle = EnvironmentHandle::venv_layout(root);
        fs::create_dir_all(handle.bin_dir.to_native())
            .and_then(|()| fs::write(root.join(FAKE_ENV_MARKER).to_native(), "fake\n"))
            .map_err(|e| FacilityError::new(e.to_string()))?;
        state.created.push(root.clone());
        Ok(handle)
    }

    fn open(&self, root: &NormalizedPath) -> Result<EnvironmentHandle, FacilityError> {
        if !self.exists(root) {
            return Err(FacilityError::new(format!("no fake environment at {}", root)));
        }
        Ok(EnvironmentHandle::venv_layout(root))
    }

    fn owns_entry(&self, name: &str) -> bool {
        matches!(name, FAKE_ENV_MARKER | "bin" | "Scripts")
    }

    fn activate(&self, handle: &EnvironmentHandle) -> Result<ActiveEnvironment, FacilityError> {
        let mut state = lock(&self.state);
        if let Some(message) = &state.fail_activate {
            return Err(FacilityError::new(message.clone()));
        }
        state.activations += 1;
        Ok(ActiveEnvironment::new(handle.clone()).with_var("VIRTUAL_ENV", handle.root.as_str()))
    }

    fn deactivate(&self, _active: &ActiveEnvironment) {
        lock(&self.state).deactivations += 1;
    }
}

#[derive(Debug, Default)]
struct InstallerState {
    /// (environment root, package) -> version
    installed: HashMap<(String, String), String>,
    install_calls: Vec<String>,
    verify_calls: Vec<String>,
    latest: HashMap<String, String>,
    install_failures: HashMap<String, (i32, String)>,
    unlaunchable: HashSet<String>,
    verify_failures: HashMap<String, String>,
    version_query_failures: HashMap<String, String>,
}

struct GateInner {
    entered: Sender<()>,
    release: Receiver<()>,
}

#[derive(Default)]
struct InstallerInner {
    state: Mutex<InstallerState>,
    gate: Mutex<Option<GateInner>>,
}

/// Installation facility that keeps an in-memory package table per root.
///
/// Installs `==X` pins as version `X`; anything else gets the version set
/// with [`FakeInstaller::with_latest`], or `1.0.0`.
#[derive(Clone, Default)]
pub struct FakeInstaller {
    inner: Arc<InstallerInner>,
}

/// Holds the first install of a gated [`FakeInstaller`] until released.
pub struct InstallGate {
    entered: Receiver<()>,
    release: Sender<()>,
}

impl InstallGate {
    /// Block until the gated install has started.
    pub fn wait_until_entered(&self) {
        self.entered
            .recv()
            .expect("InstallGate: installer dropped before entering");
    }

    /// Let the gated install finish.
    pub fn release(&self) {
        let _ = self.release.send(());
    }
}

impl FakeInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// An installer whose first `install` call parks until the gate opens.
    pub fn gated() -> (Self, InstallGate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let installer = Self::new();
        *lock(&installer.inner.gate) = Some(GateInner {
            entered: entered_tx,
            release: release_rx,
        });
        (
            installer,
            InstallGate {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }

    fn state(&self) -> MutexGuard<'_, InstallerState> {
        lock(&self.inner.state)
    }

    /// Version served for unpinned installs of `name`.
    pub fn with_latest(self, name: &str, version: &str) -> Self {
        self.state().latest.insert(name.to_string(), version.to_string());
        self
    }

    /// Installing `name` exits with `exit_code` and prints `log`.
    pub fn failing_install(self, name: &str, exit_code: i32, log: &str) -> Self {
        self.state()
            .install_failures
            .insert(name.to_string(), (exit_code, log.to_string()));
        self
    }

    /// Installing `name` cannot even start.
    pub fn unlaunchable(self, name: &str) -> Self {
        self.state().unlaunchable.insert(name.to_string());
        self
    }

    /// `name` installs fine but its entry point is broken.
    pub fn failing_verify(self, name: &str, message: &str) -> Self {
        self.set_verify_failure(name, Some(message));
        self
    }

    /// `name` installs, but asking for its version fails with `message`.
    pub fn failing_version_query(self, name: &str, message: &str) -> Self {
        self.state()
            .version_query_failures
            .insert(name.to_string(), message.to_string());
        self
    }

    pub fn set_verify_failure(&self, name: &str, message: Option<&str>) {
        let mut state = self.state();
        match message {
            Some(m) => state.verify_failures.insert(name.to_string(), m.to_string()),
            None => state.verify_failures.remove(name),
        };
    }

    /// Pretend `name` was installed at `root` outside the provisioner.
    pub fn preinstall(&self, root: &NormalizedPath, name: &str, version: &str) {
        self.state()
            .installed
            .insert((root.as_str().to_string(), name.to_string()), version.to_string());
    }

    /// Pretend `name` was removed from `root` outside the provisioner.
    pub fn uninstall(&self, root: &NormalizedPath, name: &str) {
        self.state()
            .installed
            .remove(&(root.as_str().to_string(), name.to_string()));
    }

    /// Names passed to `install`, in call order.
    pub fn install_calls(&self) -> Vec<String> {
        self.state().install_calls.clone()
    }

    pub fn install_count(&self) -> usize {
        self.state().install_calls.len()
    }

    pub fn verify_calls(&self) -> Vec<String> {
        self.state().verify_calls.clone()
    }

    pub fn version_at(&self, root: &NormalizedPath, name: &str) -> Option<String> {
        self.state()
            .installed
            .get(&(root.as_str().to_string(), name.to_string()))
            .cloned()
    }

    fn pass_gate(&self) {
        let gate = lock(&self.inner.gate).take();
        if let Some(gate) = gate {
            let _ = gate.entered.send(());
            let _ = gate.release.recv();
        }
    }
}

impl InstallFacility for FakeInstaller {
    fn installed_version(
        &self,
        env: &ActiveEnvironment,
        name: &str,
    ) -> Result<Option<String>, FacilityError> {
        if let Some(message) = self.state().version_query_failures.get(name) {
            return Err(FacilityError::new(message.clone()));
        }
        Ok(self.version_at(env.root(), name))
    }

    fn install(
        &self,
        env: &ActiveEnvironment,
        tool: &ToolRequirement,
    ) -> Result<InstallOutcome, FacilityError> {
        let name = tool.name().to_string();
        self.state().install_calls.push(name.clone());
        self.pass_gate();

        let mut state = self.state();
        if state.unlaunchable.contains(&name) {
            return Err(FacilityError::new("installer not found"));
        }
        if let Some((exit_code, log)) = state.install_failures.get(&name) {
            return Ok(InstallOutcome {
                version: None,
                exit_code: Some(*exit_code),
                log: log.clone(),
            });
        }

        let version = match tool.version_constraint().and_then(|c| c.strip_prefix("==")) {
            Some(pinned) => pinned.to_string(),
            None => state
                .latest
                .get(&name)
                .cloned()
                .unwrap_or_else(|| "1.0.0".to_string()),
        };
        state
            .installed
            .insert((env.root().as_str().to_string(), name.clone()), version.clone());
        let reported = (!state.version_query_failures.contains_key(&name)).then_some(version.clone());
        Ok(InstallOutcome {
            log: format!("Successfully installed {}-{}", name, version),
            version: reported,
            exit_code: Some(0),
        })
    }

    fn verify(
        &self,
        env: &ActiveEnvironment,
        tool: &ToolRequirement,
    ) -> Result<String, FacilityError> {
        let mut state = self.state();
        state.verify_calls.push(tool.name().to_string());
        if let Some(message) = state.verify_failures.get(tool.name()) {
            return Err(FacilityError::new(message.clone())
                .with_diagnostics(format!("{}: bad interpreter", tool.entry_point())));
        }
        let key = (env.root().as_str().to_string(), tool.name().to_string());
        match state.installed.get(&key) {
            Some(version) => Ok(format!("{} {}", tool.entry_point(), version)),
            None => Err(FacilityError::new(format!(
                "entry point {} does not exist",
                tool.entry_point()
            ))),
        }
    }
}
