//! Daemon lifecycle specs
//!
//! Verify startup, the single-instance lock, socket handshake and
//! shutdown on request.

use crate::prelude::*;
use sb_daemon::protocol::{Request, Response, PROTOCOL_VERSION};
use serial_test::serial;

#[test]
#[serial]
fn daemon_starts_and_answers_ping() {
    let mut project = Project::empty();
    project.start();

    assert_eq!(project.request(&Request::Ping), Response::Pong);
    assert_eq!(
        project.request(&Request::Hello {
            version: PROTOCOL_VERSION.to_string()
        }),
        Response::Hello {
            version: PROTOCOL_VERSION.to_string()
        }
    );

    let pid = std::fs::read_to_string(project.state_path().join("daemon.pid")).unwrap();
    assert!(pid.trim().parse::<u32>().is_ok(), "pid file: {pid:?}");
    let log = project.daemon_log();
    assert!(log.contains("--- sbd: starting (pid: "), "log: {log}");
}

#[test]
#[serial]
fn second_daemon_reports_already_running() {
    let mut project = Project::empty();
    project.start();

    let output = project.sbd().output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sbd is already running"), "got: {stderr}");

    // The first daemon is unaffected
    assert_eq!(project.request(&Request::Ping), Response::Pong);
}

#[test]
#[serial]
fn shutdown_request_stops_daemon_and_removes_state_files() {
    let mut project = Project::empty();
    project.start();

    assert_eq!(
        project.request(&Request::Shutdown {
            close_sessions: false
        }),
        Response::ShuttingDown
    );
    assert!(project.wait_stopped(), "daemon did not exit");
    assert!(!project.socket_path().exists());
    assert!(!project.state_path().join("daemon.pid").exists());
}

#[test]
#[serial]
fn daemon_restarts_after_shutdown() {
    let mut project = Project::empty();
    project.start();
    project.request(&Request::Shutdown {
        close_sessions: false,
    });
    assert!(project.wait_stopped());

    project.start();
    assert_eq!(project.request(&Request::Ping), Response::Pong);
}

#[test]
#[serial]
fn invalid_settings_fail_startup_without_socket() {
    let project = Project::empty();
    project.config("rows = 0\n");

    let output = project.sbd().output().unwrap();
    assert!(!output.status.success());
    assert!(!project.socket_path().exists());
    assert!(!project.state_path().join("daemon.pid").exists());
    let log = project.daemon_log();
    assert!(log.contains("Failed to start daemon"), "log: {log}");
}

#[test]
#[serial]
fn unknown_settings_keys_are_rejected() {
    let project = Project::empty();
    project.config("no_such_key = true\n");

    let output = project.sbd().output().unwrap();
    assert!(!output.status.success());
    assert!(!project.socket_path().exists());
}
