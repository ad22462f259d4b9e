//! Scoped activation of an isolated environment

use crate::error::FacilityError;
use crate::facility::{ActiveEnvironment, EnvironmentHandle, IsolationFacility};
use std::ops::Deref;

/// Pairs [`IsolationFacility::activate`] with `deactivate`.
///
/// Deactivation runs when the guard drops, so every exit path (early
/// return, `?`, panic unwinding) leaves the facility as it found it.
pub struct ActivationGuard<'a, I: IsolationFacility + ?Sized> {
    facility: &'a I,
    active: ActiveEnvironment,
}

impl<'a, I: IsolationFacility + ?Sized> ActivationGuard<'a, I> {
    pub fn activate(facility: &'a I, handle: &EnvironmentHandle) -> Result<Self, FacilityError> {
        let active = facility.activate(handle)?;
        tracing::debug!(root = %handle.root, "environment activated");
        Ok(Self { facility, active })
    }
}

impl<I: IsolationFacility + ?Sized> Deref for ActivationGuard<'_, I> {
    type Target = ActiveEnvironment;

    fn deref(&self) -> &ActiveEnvironment {
        &self.active
    }
}

impl<I: IsolationFacility + ?Sized> Drop for ActivationGuard<'_, I> {
    fn drop(&mut self) {
        self.facility.deactivate(&self.active);
        tracing::debug!(root = %self.active.root(), "environment deactivated");
    }
}
