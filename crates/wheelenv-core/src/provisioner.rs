//! The provisioning workflow: lock, isolate, activate, install, verify

use crate::activation::ActivationGuard;
use crate::error::{FacilityError, ProvisionError};
use crate::facility::{ActiveEnvironment, EnvironmentHandle, InstallFacility, IsolationFacility};
use crate::receipt::Receipt;
use crate::result::{Failure, InstalledTool, ProvisioningResult, Step};
use crate::spec::{EnvironmentSpec, ToolRequirement};
use crate::status::{EnvironmentStatus, ToolStatus};
use crate::{LOCK_FILE_NAME, is_bookkeeping_entry};
use tracing::{debug, info, warn};
use wheelenv_fs::{DirLock, NormalizedPath};

/// Drives an isolation facility and an installation facility to the state
/// an [`EnvironmentSpec`] describes.
///
/// Runs are sequential and fail fast. Two runs against the same root never
/// overlap: the second one fails with
/// [`ProvisionError::ConcurrentProvisioningDetected`].
pub struct Provisioner<I, P> {
    isolation: I,
    installer: P,
}

impl<I: IsolationFacility, P: InstallFacility> Provisioner<I, P> {
    pub fn new(isolation: I, installer: P) -> Self {
        Self {
            isolation,
            installer,
        }
    }

    pub fn installer(&self) -> &P {
        &self.installer
    }

    /// Bring the environment described by `spec` into existence.
    ///
    /// Never panics on facility failures; the outcome, including which step
    /// and tool failed, is in the returned [`ProvisioningResult`].
    pub fn provision(&self, spec: &EnvironmentSpec) -> ProvisioningResult {
        let span = tracing::info_span!("provision", root = %spec.root());
        let _enter = span.enter();

        let mut installed = Vec::with_capacity(spec.tools().len());
        match self.run(spec, &mut installed) {
            Ok(()) => {
                info!(tools = installed.len(), "environment provisioned");
                ProvisioningResult::succeeded(installed)
            }
            Err(failure) => {
                warn!(step = %failure.step, error = %failure.error, "provisioning failed");
                ProvisioningResult::failed(installed, failure)
            }
        }
    }

    /// Report the state of `spec.root()` without changing anything.
    ///
    /// The root's lock is only tried when a run's marker is in the lock
    /// file, so checking an idle root never contends with a run starting.
    pub fn inspect(&self, spec: &EnvironmentSpec) -> EnvironmentStatus {
        let root = spec.root();
        let receipt = Receipt::load_or_default(root);
        let tools = spec
            .tools()
            .iter()
            .map(|tool| {
                let recorded = receipt.get(tool.name());
                ToolStatus {
                    name: tool.name().to_string(),
                    constraint: tool.version_constraint().map(String::from),
                    recorded_version: recorded.map(|e| e.version.clone()),
                    constraint_matches: receipt.entry_for(tool).is_some(),
                }
            })
            .collect();

        EnvironmentStatus {
            root: root.clone(),
            environment_present: self.isolation.exists(root),
            in_progress: DirLock::is_held(root, LOCK_FILE_NAME),
            tools,
        }
    }

    fn run(
        &self,
        spec: &EnvironmentSpec,
        installed: &mut Vec<InstalledTool>,
    ) -> Result<(), Failure> {
        let root = spec.root();

        // Declared first so it is released last
        let _lock = self.lock(root)?;
        let handle = self.isolate(spec)?;

        let active = ActivationGuard::activate(&self.isolation, &handle).map_err(|e| {
            Failure::new(
                Step::Activate,
                ProvisionError::ActivationFailed {
                    path: root.to_string(),
                    message: e.message,
                    diagnostics: e.diagnostics,
                },
            )
        })?;

        let mut receipt = Receipt::load_or_default(root);
        for tool in spec.tools() {
            installed.push(self.install_tool(&active, tool, &mut receipt, root)?);
        }
        for tool in spec.tools() {
            self.verify_tool(&active, tool, &mut receipt, root)?;
        }
        Ok(())
    }

    fn lock(&self, root: &NormalizedPath) -> Result<DirLock, Failure> {
        let lock = DirLock::try_acquire(root, LOCK_FILE_NAME).map_err(|e| match e {
            wheelenv_fs::Error::LockHeld { .. } => Failure::new(
                Step::Lock,
                ProvisionError::ConcurrentProvisioningDetected {
                    path: root.to_string(),
                },
            ),
            other => Failure::new(
                Step::Lock,
                ProvisionError::EnvironmentCreationFailed {
                    path: root.to_string(),
                    message: other.to_string(),
                    diagnostics: String::new(),
                },
            ),
        })?;
        debug!(lock = %lock.path(), "holding root lock");
        Ok(lock)
    }

    fn isolate(&self, spec: &EnvironmentSpec) -> Result<EnvironmentHandle, Failure> {
        let root = spec.root();
        let creation_failed = |message: String, diagnostics: String| {
            Failure::new(
                Step::Isolate,
                ProvisionError::EnvironmentCreationFailed {
                    path: root.to_string(),
                    message,
                    diagnostics,
                },
            )
        };
        let from_facility = |e: FacilityError| creation_failed(e.message, e.diagnostics);

        if self.isolation.exists(root) {
            if !spec.reuse_existing() {
                return Err(creation_failed(
                    "an environment already exists and reuse is disabled".to_string(),
                    String::new(),
                ));
            }
            info!("reusing existing environment");
            return self.isolation.open(root).map_err(from_facility);
        }

        let owned = |name: &str| self.isolation.owns_entry(name);
        if let Some(entry) =
            foreign_entry(root, owned).map_err(|e| creation_failed(e, String::new()))?
        {
            return Err(creation_failed(
                format!(
                    "directory is not empty (found '{}') and holds no environment",
                    entry
                ),
                String::new(),
            ));
        }

        info!("creating isolated environment");
        self.isolation.create(root).map_err(from_facility)
    }

    fn install_tool(
        &self,
        env: &ActiveEnvironment,
        tool: &ToolRequirement,
        receipt: &mut Receipt,
        root: &NormalizedPath,
    ) -> Result<InstalledTool, Failure> {
        if let Some(entry) = receipt.entry_for(tool) {
            match self.installer.installed_version(env, tool.name()) {
                Ok(Some(current)) if current == entry.version => {
                    info!(tool = tool.name(), version = %current, "already installed");
                    return Ok(InstalledTool::reused(tool.name(), current));
                }
                Ok(current) => debug!(
                    tool = tool.name(),
                    recorded = %entry.version,
                    ?current,
                    "receipt out of date, reinstalling"
                ),
                Err(e) => warn!(tool = tool.name(), error = %e, "could not query installed version"),
            }
        }

        info!(requirement = %tool, "installing");
        let install_failed = |exit_code: Option<i32>, log: String| {
            Failure::new(
                Step::Install,
                ProvisionError::ToolInstallFailed {
                    tool: tool.name().to_string(),
                    exit_code,
                    log,
                },
            )
        };

        let outcome = self
            .installer
            .install(env, tool)
            .map_err(|e| install_failed(None, e.to_report()))?;
        if !outcome.succeeded() {
            return Err(install_failed(outcome.exit_code, outcome.log));
        }

        let version = match outcome.version {
            Some(version) => version,
            None => match self.installer.installed_version(env, tool.name()) {
                Ok(Some(version)) => version,
                Ok(None) => {
                    return Err(Failure::new(
                        Step::Verify,
                        ProvisionError::ToolVerificationFailed {
                            tool: tool.name().to_string(),
                            message: "installer reported success but the package is not installed"
                                .to_string(),
                            diagnostics: outcome.log,
                        },
                    ));
                }
                Err(e) => {
                    return Err(Failure::new(
                        Step::Verify,
                        ProvisionError::ToolVerificationFailed {
                            tool: tool.name().to_string(),
                            message: e.message,
                            diagnostics: e.diagnostics,
                        },
                    ));
                }
            },
        };

        info!(tool = tool.name(), version = %version, "installed");
        receipt.record(tool, version.clone());
        if let Err(e) = receipt.save(root) {
            warn!(error = %e, "failed to write receipt; the next run will reinstall");
        }
        Ok(InstalledTool::installed(tool.name(), version))
    }

    fn verify_tool(
        &self,
        env: &ActiveEnvironment,
        tool: &ToolRequirement,
        receipt: &mut Receipt,
        root: &NormalizedPath,
    ) -> Result<(), Failure> {
        match self.installer.verify(env, tool) {
            Ok(banner) => {
                debug!(tool = tool.name(), banner = %banner, "verified");
                Ok(())
            }
            Err(e) => {
                // A broken entry point must not be skipped as "installed" next run
                if receipt.forget(tool.name()).is_some() {
                    if let Err(save_err) = receipt.save(root) {
                        warn!(error = %save_err, "failed to write receipt");
                    }
                }
                Err(Failure::new(
                    Step::Verify,
                    ProvisionError::ToolVerificationFailed {
                        tool: tool.name().to_string(),
                        message: e.message,
                        diagnostics: e.diagnostics,
                    },
                ))
            }
        }
    }
}

/// First entry under `root` that is neither provisioner bookkeeping nor a
/// leftover the isolation facility owns.
fn foreign_entry(
    root: &NormalizedPath,
    owned: impl Fn(&str) -> bool,
) -> Result<Option<String>, String> {
    let native = root.to_native();
    let entries = std::fs::read_dir(&native)
        .map_err(|e| format!("cannot read {}: {}", native.display(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| format!("cannot read {}: {}", native.display(), e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_bookkeeping_entry(&name) && !owned(&name) {
            return Ok(Some(name));
        }
    }
    Ok(None)
}
