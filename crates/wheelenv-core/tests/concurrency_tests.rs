//! Mutual exclusion between provisioning runs on the same root

use std::thread;
use wheelenv_core::{ProvisionError, Provisioner, Step};
use wheelenv_test_utils::{FakeInstaller, FakeIsolation, TestWorkspace};

#[test]
fn test_overlapping_runs_one_succeeds_one_detects_conflict() {
    let ws = TestWorkspace::new();
    let spec = ws.spec(&[("builder", None)]);
    let (installer, gate) = FakeInstaller::gated();
    let provisioner = Provisioner::new(FakeIsolation::new(), installer.clone());

    let (first, second) = thread::scope(|s| {
        let first = s.spawn(|| provisioner.provision(&spec));

        // The first run is parked inside install, holding the root's lock
        gate.wait_until_entered();
        let second = provisioner.provision(&spec);
        gate.release();

        (first.join().expect("first run panicked"), second)
    });

    assert!(first.success, "unexpected failure: {:?}", first.failure);
    assert!(!second.success);
    let failure = second.failure.unwrap();
    assert_eq!(failure.step, Step::Lock);
    assert!(matches!(
        failure.error,
        ProvisionError::ConcurrentProvisioningDetected { .. }
    ));
    assert!(second.installed_tools.is_empty());
    assert_eq!(installer.install_count(), 1);
}

#[test]
fn test_inspect_sees_run_in_progress() {
    let ws = TestWorkspace::new();
    let spec = ws.spec(&[("builder", None)]);
    let (installer, gate) = FakeInstaller::gated();
    let provisioner = Provisioner::new(FakeIsolation::new(), installer);

    thread::scope(|s| {
        let run = s.spawn(|| provisioner.provision(&spec));
        gate.wait_until_entered();

        let status = provisioner.inspect(&spec);
        assert!(status.in_progress);
        assert!(!status.is_ready());

        gate.release();
        assert!(run.join().unwrap().success);
    });

    assert!(!provisioner.inspect(&spec).in_progress);
}

#[test]
fn test_serialized_runs_both_succeed() {
    let ws = TestWorkspace::new();
    let spec = ws.spec(&[("builder", None), ("patchelf", None)]);
    let installer = FakeInstaller::new();
    let provisioner = Provisioner::new(FakeIsolation::new(), installer.clone());

    let results: Vec<_> = (0..3).map(|_| provisioner.provision(&spec)).collect();

    assert!(results.iter().all(|r| r.success));
    assert_eq!(installer.install_count(), 2);
}

#[test]
fn test_parallel_runs_on_distinct_roots() {
    let ws = TestWorkspace::new();
    let installer = FakeInstaller::new();
    let provisioner = Provisioner::new(FakeIsolation::new(), installer.clone());
    let specs: Vec<_> = (0..4)
        .map(|i| ws.spec_at(&ws.root_named(&format!("env-{i}")), &[("builder", None)]))
        .collect();

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = specs
            .iter()
            .map(|spec| s.spawn(|| provisioner.provision(spec)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.iter().all(|r| r.success));
    assert_eq!(installer.install_count(), 4);
}
