// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::mpsc;
use std::time::Duration;

/// Drain `reader` on a thread until `needle` shows up, EOF, or timeout.
fn read_until(mut reader: Box<dyn Read + Send>, needle: &str) -> String {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = [0u8; 1024];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut seen = String::new();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !seen.contains(needle) {
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(bytes) => seen.push_str(&String::from_utf8_lossy(&bytes)),
            Err(_) => break,
        }
    }
    seen
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[test]
fn spawned_process_output_is_readable() {
    let process = NativePtyHost::new()
        .spawn(&PtySpec::new(argv(&["sh", "-c", "echo pty-says-hi"])))
        .unwrap();
    assert!(process.pid().is_some());

    let output = read_until(process.take_reader().unwrap(), "pty-says-hi");
    assert!(output.contains("pty-says-hi"), "got: {output:?}");
}

#[test]
fn environment_and_cwd_reach_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let spec = PtySpec::new(argv(&["sh", "-c", "echo \"$SB_MARK@$(pwd)\""]))
        .cwd(dir.path())
        .env("SB_MARK", "marked")
        .env_remove("TMUX");
    let process = NativePtyHost::new().spawn(&spec).unwrap();

    let output = read_until(process.take_reader().unwrap(), "marked@");
    assert!(output.contains("marked@"), "got: {output:?}");
    let name = dir.path().file_name().unwrap().to_string_lossy().to_string();
    assert!(output.contains(&name), "cwd missing from {output:?}");
}

#[test]
fn writer_input_is_echoed_back() {
    let process = NativePtyHost::new()
        .spawn(&PtySpec::new(argv(&["cat"])))
        .unwrap();
    let reader = process.take_reader().unwrap();
    let mut writer = process.take_writer().unwrap();
    writer.write_all(b"round-trip\n").unwrap();
    writer.flush().unwrap();

    let output = read_until(reader, "round-trip");
    assert!(output.contains("round-trip"));
    process.terminate();
}

#[test]
fn writer_can_only_be_taken_once() {
    let process = NativePtyHost::new()
        .spawn(&PtySpec::new(argv(&["cat"])))
        .unwrap();
    let _writer = process.take_writer().unwrap();
    assert!(matches!(process.take_writer(), Err(PtyError::Io(_))));
    process.terminate();
}

#[test]
fn resize_updates_size() {
    let process = NativePtyHost::new()
        .spawn(&PtySpec::new(argv(&["cat"])).size(30, 100))
        .unwrap();
    assert_eq!(process.size().unwrap(), (30, 100));

    process.resize(40, 120).unwrap();
    assert_eq!(process.size().unwrap(), (40, 120));
    process.terminate();
}

#[test]
fn terminate_stops_the_child_and_is_idempotent() {
    let process = NativePtyHost::new()
        .spawn(&PtySpec::new(argv(&["cat"])))
        .unwrap();
    assert!(process.is_running());

    process.terminate();
    assert!(!process.is_running());
    process.terminate();
}

#[test]
fn empty_argv_is_rejected() {
    let err = NativePtyHost::new().spawn(&PtySpec::new(vec![])).unwrap_err();
    assert!(matches!(err, PtyError::EmptyCommand));
}

#[test]
fn missing_program_fails_to_spawn() {
    let err = NativePtyHost::new()
        .spawn(&PtySpec::new(argv(&["/nonexistent/sb-client"])))
        .unwrap_err();
    match err {
        PtyError::Spawn { program, .. } => assert_eq!(program, "/nonexistent/sb-client"),
        other => panic!("expected Spawn error, got {other:?}"),
    }
}

#[test]
fn fake_host_records_specs_and_runs_stand_in() {
    let host = FakePtyHost::new();
    let spec = PtySpec::new(argv(&["tmux", "attach-session", "-t", "alice:demo-p7"]))
        .env("TERM", "xterm-256color")
        .size(30, 100);
    let process = host.spawn(&spec).unwrap();

    assert_eq!(host.spawned(), vec![spec]);
    assert!(process.is_running());
    assert_eq!(process.size().unwrap(), (30, 100));
    process.terminate();
}

#[test]
fn fake_host_injected_failure() {
    let host = FakePtyHost::with_stand_in(["sh", "-c", "exit 0"]);
    host.set_fail(true);
    let err = host.spawn(&PtySpec::new(argv(&["tmux"]))).unwrap_err();
    assert!(matches!(err, PtyError::Spawn { .. }));
    assert_eq!(host.spawned().len(), 1);

    host.set_fail(false);
    assert!(host.spawn(&PtySpec::new(argv(&["tmux"]))).is_ok());
}
