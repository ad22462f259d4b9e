//! Provisioning against a real `python -m venv`.
//!
//! Installation still goes through the fake installer so these tests never
//! touch the network. Each test returns early when no Python launcher is on
//! `PATH`.

use pretty_assertions::assert_eq;
use std::fs;
use std::process::Command;
use wheelenv_core::{
    ActivationGuard, IsolationFacility, Provisioner, Step, ToolAction, VenvFacility,
};
use wheelenv_test_utils::{FakeInstaller, TestWorkspace, python_available};

fn venv() -> VenvFacility {
    VenvFacility::new().without_pip()
}

#[test]
fn test_venv_create_and_reopen() {
    if !python_available() {
        return;
    }
    let ws = TestWorkspace::new();
    let root = ws.root();
    let facility = venv();

    assert!(!facility.exists(&root));
    let created = facility.create(&root).unwrap();
    assert!(facility.exists(&root));
    assert!(created.interpreter.is_file());
    assert!(root.join("pyvenv.cfg").is_file());

    let opened = facility.open(&root).unwrap();
    assert_eq!(opened, created);
}

#[test]
fn test_activation_applies_to_child_processes_only() {
    if !python_available() {
        return;
    }
    let ws = TestWorkspace::new();
    let root = ws.root();
    let facility = venv();
    let handle = facility.create(&root).unwrap();
    let outer_virtual_env = std::env::var_os("VIRTUAL_ENV");

    {
        let active = ActivationGuard::activate(&facility, &handle).unwrap();
        assert_eq!(active.var("VIRTUAL_ENV"), Some(root.to_native().as_os_str()));
        assert!(active.is_unset("PYTHONHOME"));

        let output = active
            .interpreter_command()
            .args(["-c", "import sys; print(sys.prefix != sys.base_prefix)"])
            .output()
            .unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "True");

        assert_eq!(std::env::var_os("VIRTUAL_ENV"), outer_virtual_env);
    }

    assert_eq!(std::env::var_os("VIRTUAL_ENV"), outer_virtual_env);
}

#[test]
fn test_provision_then_reuse_real_environment() {
    if !python_available() {
        return;
    }
    let ws = TestWorkspace::new();
    let spec = ws.spec(&[("maturin", Some("1.7.4")), ("patchelf", None)]);
    let provisioner = Provisioner::new(venv(), FakeInstaller::new());

    let first = provisioner.provision(&spec);
    assert!(first.success, "{:?}", first.failure);
    assert_eq!(first.version_of("maturin"), Some("1.7.4"));
    let config_before = fs::read_to_string(spec.root().join("pyvenv.cfg").to_native()).unwrap();

    let second = provisioner.provision(&spec);
    assert!(second.success, "{:?}", second.failure);
    assert!(
        second
            .installed_tools
            .iter()
            .all(|t| t.action == ToolAction::Reused)
    );
    assert_eq!(provisioner.installer().install_count(), 2);

    let config_after = fs::read_to_string(spec.root().join("pyvenv.cfg").to_native()).unwrap();
    assert_eq!(config_before, config_after);
    assert!(provisioner.inspect(&spec).is_ready());
}

#[test]
fn test_fresh_only_leaves_real_environment_alone() {
    if !python_available() {
        return;
    }
    let ws = TestWorkspace::new();
    let spec = ws.spec(&[("maturin", None)]);
    venv().create(spec.root()).unwrap();
    let before = ws.entries(spec.root());

    let provisioner = Provisioner::new(venv(), FakeInstaller::new());
    let result = provisioner.provision(&spec.clone().with_reuse_existing(false));

    assert!(!result.success);
    assert_eq!(result.failure.unwrap().step, Step::Isolate);
    assert_eq!(provisioner.installer().install_count(), 0);
    let mut after = ws.entries(spec.root());
    after.retain(|e| e != ".wheelenv.lock");
    assert_eq!(before, after);
}

/// Whether the launcher can bootstrap pip without a network.
fn ensurepip_available() -> bool {
    let launcher = if cfg!(windows) { "python" } else { "python3" };
    Command::new(launcher)
        .args(["-m", "ensurepip", "--version"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[test]
fn test_rerun_recovers_from_interrupted_venv_creation() {
    if !python_available() {
        return;
    }
    let ws = TestWorkspace::new();
    let spec = ws.spec(&[("maturin", None)]);
    // What `python -m venv` has written before pyvenv.cfg and the interpreter
    for dir in ["bin", "include", "lib"] {
        fs::create_dir_all(spec.root().join(dir).to_native()).unwrap();
    }

    let provisioner = Provisioner::new(venv(), FakeInstaller::new());
    let result = provisioner.provision(&spec);

    assert!(result.success, "{:?}", result.failure);
    assert!(provisioner.inspect(&spec).environment_present);
}

#[test]
fn test_reuse_bootstraps_missing_pip() {
    if !python_available() || !ensurepip_available() {
        return;
    }
    let ws = TestWorkspace::new();
    let spec = ws.spec(&[("maturin", None)]);
    // Stands in for a creation killed while ensurepip was running
    let handle = venv().create(spec.root()).unwrap();

    let provisioner = Provisioner::new(VenvFacility::new(), FakeInstaller::new());
    let result = provisioner.provision(&spec);

    assert!(result.success, "{:?}", result.failure);
    let pip = Command::new(handle.interpreter.to_native())
        .args(["-m", "pip", "--version"])
        .output()
        .unwrap();
    assert!(pip.status.success());
}

#[test]
fn test_missing_launcher_is_a_creation_failure() {
    let ws = TestWorkspace::new();
    let spec = ws.spec(&[("maturin", None)]);
    let isolation = VenvFacility::new().with_python("wheelenv-test-no-such-python");
    let provisioner = Provisioner::new(isolation, FakeInstaller::new());

    let result = provisioner.provision(&spec);

    assert!(!result.success);
    let failure = result.failure.unwrap();
    assert_eq!(failure.step, Step::Isolate);
    assert!(failure.to_string().contains("wheelenv-test-no-such-python"));
    assert_eq!(provisioner.installer().install_count(), 0);
}
