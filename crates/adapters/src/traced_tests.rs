// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::tmux::{FakeTmux, TmuxCall};
use serial_test::{parallel, serial};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run an async block under a capturing subscriber
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn assert_log(logs: &str, label: &str, expected: &str) {
    assert!(logs.contains(expected), "Should log {label}. Logs:\n{logs}");
}

fn demo_target() -> WindowTarget {
    WindowTarget::new("alice", "demo-p7")
}

async fn traced_with_window() -> (FakeTmux, TracedTmux<FakeTmux>) {
    let fake = FakeTmux::new();
    let traced = TracedTmux::new(fake.clone());
    traced.new_session("alice", Path::new("/tmp")).await.unwrap();
    traced
        .new_window("alice", "demo-p7", Path::new("/tmp"))
        .await
        .unwrap();
    (fake, traced)
}

#[test]
#[serial(tracing)]
fn new_window_logs_span_and_timing() {
    let (logs, result) = with_tracing(|| async {
        let (_, traced) = traced_with_window().await;
        traced.pane_count(&demo_target()).await
    });

    assert_eq!(result.unwrap(), 1);
    assert_log(&logs, "span name", "tmux.new_window");
    assert_log(&logs, "window name", "demo-p7");
    assert_log(&logs, "completion", "window created");
    assert_log(&logs, "timing", "elapsed_ms");
    assert_log(&logs, "session span", "tmux.new_session");
}

#[test]
#[serial(tracing)]
fn failed_new_window_logs_error() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeTmux::new();
        fake.fail_window("broken");
        let traced = TracedTmux::new(fake);
        traced.new_session("alice", Path::new("/tmp")).await.unwrap();
        traced.new_window("alice", "broken", Path::new("/tmp")).await
    });

    assert!(result.is_err());
    assert_log(&logs, "failure", "new-window failed");
    assert_log(&logs, "stderr", "create window failed: broken");
}

#[test]
#[serial(tracing)]
fn send_keys_logs_operation() {
    let (logs, result) = with_tracing(|| async {
        let (_, traced) = traced_with_window().await;
        traced.send_keys(&demo_target(), "ls", true).await
    });

    assert!(result.is_ok());
    assert_log(&logs, "send span", "tmux.send_keys");
    assert_log(&logs, "send entry", "sending");
}

#[test]
#[serial(tracing)]
fn missing_window_logs_warning() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedTmux::new(FakeTmux::new());
        traced.send_literal(&demo_target(), "x").await
    });

    assert!(result.is_err());
    assert_log(&logs, "failure", "tmux command failed");
    assert_log(&logs, "op", "send_literal");
}

#[test]
#[serial(tracing)]
fn missing_tmux_logs_error() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeTmux::new();
        fake.set_installed(false);
        TracedTmux::new(fake).ensure_installed().await
    });

    assert!(result.unwrap_err().is_not_installed());
    assert_log(&logs, "error", "tmux missing");
}

#[test]
#[serial(tracing)]
fn kill_window_failure_is_only_a_warning() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedTmux::new(FakeTmux::new());
        traced.kill_window(&demo_target()).await
    });

    assert!(result.is_err());
    assert_log(&logs, "kill span", "tmux.kill_window");
    assert_log(&logs, "warning", "kill failed");
}

#[tokio::test]
#[parallel(tracing)]
async fn delegates_calls_to_inner_gateway() {
    let (fake, traced) = traced_with_window().await;
    fake.clear_calls();

    traced.resize_window(&demo_target(), 40, 120).await.unwrap();
    traced
        .set_option(&demo_target(), "remain-on-exit", "on")
        .await
        .unwrap();

    assert_eq!(
        fake.calls(),
        vec![
            TmuxCall::ResizeWindow {
                target: "alice:demo-p7".to_string(),
                rows: 40,
                cols: 120,
            },
            TmuxCall::SetOption {
                target: "alice:demo-p7".to_string(),
                option: "remain-on-exit".to_string(),
                value: "on".to_string(),
            },
        ]
    );
    assert_eq!(fake.window("alice:demo-p7").unwrap().size, Some((40, 120)));
}

#[tokio::test]
#[parallel(tracing)]
async fn for_account_rebinds_the_inner_gateway() {
    let (fake, traced) = traced_with_window().await;
    let bob = traced.for_account(Some("bob"));
    assert_eq!(bob.account(), Some("bob"));
    assert_eq!(bob.inner().account(), Some("bob"));

    fake.clear_calls();
    assert!(bob.has_window(&demo_target()).await.unwrap());
    assert_eq!(fake.accounts(), vec![Some("bob".to_string())]);
    assert_eq!(
        bob.attach_argv(&demo_target()),
        vec!["tmux", "attach-session", "-t", "alice:demo-p7"]
    );
}
