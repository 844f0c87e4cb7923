//! Daemon help and version specs
//!
//! Verify sbd --help and --version work without touching the state
//! directory.

use crate::prelude::*;
use std::process::Command;

fn sbd() -> Command {
    Command::new(sbd_binary())
}

#[test]
fn sbd_version_prints_package_version() {
    let output = sbd().arg("--version").output().unwrap();
    assert!(output.status.success());
    similar_asserts::assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        format!("sbd {}\n", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn sbd_short_version_flags_match_long_flag() {
    let long = sbd().arg("--version").output().unwrap();
    for flag in ["-v", "-V"] {
        let short = sbd().arg(flag).output().unwrap();
        assert!(short.status.success());
        similar_asserts::assert_eq!(
            String::from_utf8_lossy(&short.stdout),
            String::from_utf8_lossy(&long.stdout)
        );
    }
}

#[test]
fn sbd_help_shows_usage() {
    let output = sbd().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("USAGE:"),
        "expected USAGE section, got: {stdout}"
    );
    assert!(stdout.contains("--help"), "expected --help in output");
    assert!(stdout.contains("--version"), "expected --version in output");
    assert!(stdout.contains("SB_STATE_DIR"), "expected state dir hint");
}

#[test]
fn sbd_help_does_not_create_state() {
    let project = Project::empty();
    let output = project.sbd().arg("-h").output().unwrap();
    assert!(output.status.success());
    assert!(!project.state_path().join("daemon.pid").exists());
    assert!(!project.socket_path().exists());
}

#[test]
fn sbd_rejects_unknown_arguments() {
    let output = sbd().arg("--bogus").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unexpected argument '--bogus'"),
        "got: {stderr}"
    );
}
