//! Shared test utilities for the wheelenv workspace.
//!
//! A dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fakes`]: in-memory isolation and installation facilities that
//!   record every call and can be told to fail
//! - [`workspace`]: [`TestWorkspace`] temp-dir fixture

pub mod fakes;
pub mod workspace;

pub use fakes::{FakeInstaller, FakeIsolation, InstallGate};
pub use workspace::TestWorkspace;

/// Whether a real Python launcher is on `PATH`.
///
/// Tests that drive the real `venv` facility return early without one.
pub fn python_available() -> bool {
    let launcher = if cfg!(windows) { "python" } else { "python3" };
    std::process::Command::new(launcher)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
