//! Environment provisioning for native-extension wheel builds.
//!
//! The [`Provisioner`] takes an [`EnvironmentSpec`] (an environment root
//! plus an ordered list of [`ToolRequirement`]s) and drives an
//! [`IsolationFacility`] and an [`InstallFacility`] until the environment
//! exists, every tool is installed, and every tool answers from inside the
//! environment. Every run ends in a [`ProvisioningResult`]; failures are
//! data, not panics.
//!
//! The production facilities are [`VenvFacility`] (`python -m venv`) and
//! [`PipFacility`] (`python -m pip`).

pub mod activation;
pub mod config;
pub mod error;
pub mod facility;
pub mod pip;
pub mod provisioner;
pub mod receipt;
pub mod result;
pub mod spec;
pub mod status;
pub mod venv;

pub use activation::ActivationGuard;
pub use config::{ProvisionConfig, ToolEntry};
pub use error::{Error, FacilityError, ProvisionError, Result};
pub use facility::{
    ActiveEnvironment, EnvironmentHandle, InstallFacility, InstallOutcome, IsolationFacility,
};
pub use pip::PipFacility;
pub use provisioner::Provisioner;
pub use receipt::{Receipt, ReceiptEntry};
pub use result::{Failure, InstalledTool, ProvisioningResult, Step, ToolAction};
pub use spec::{EnvironmentSpec, ToolRequirement};
pub use status::{EnvironmentStatus, ToolStatus};
pub use venv::VenvFacility;

/// Advisory lock file held under the root for the duration of a run.
pub const LOCK_FILE_NAME: &str = ".wheelenv.lock";

/// Receipt recording which tool versions were installed into the root.
pub const RECEIPT_FILE_NAME: &str = "provision-receipt.json";

/// Whether a root-level entry belongs to the provisioner's own bookkeeping.
///
/// Covers the lock file, the receipt, and the temp files left behind by an
/// interrupted atomic receipt write.
pub fn is_bookkeeping_entry(name: &str) -> bool {
    name == LOCK_FILE_NAME
        || name == RECEIPT_FILE_NAME
        || wheelenv_fs::io::is_temp_for(name, RECEIPT_FILE_NAME)
}
