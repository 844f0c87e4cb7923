// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn target(s: &str) -> WindowTarget {
    s.parse().unwrap()
}

#[tokio::test]
async fn new_session_disables_mouse_and_records_start_dir() {
    let tmux = FakeTmux::new();
    tmux.new_session("alice", Path::new("/srv/instance")).await.unwrap();

    assert_eq!(tmux.session_names(), vec!["alice"]);
    assert_eq!(tmux.session_option("alice", "mouse").as_deref(), Some("off"));
    assert_eq!(
        tmux.session_start_dir("alice"),
        Some(PathBuf::from("/srv/instance"))
    );
    assert!(tmux.new_session("alice", Path::new("/")).await.is_err());
}

#[tokio::test]
async fn windows_are_listed_and_removed() {
    let tmux = FakeTmux::new();
    tmux.new_session("alice", Path::new("/")).await.unwrap();
    let info = tmux
        .new_window("alice", "demo-p7", Path::new("/work"))
        .await
        .unwrap();
    assert_eq!(info.target, target("alice:demo-p7"));

    let all = tmux.list_all_windows().await.unwrap();
    assert!(all.contains(&target("alice:demo-p7")));
    assert!(tmux.has_window(&target("alice:demo-p7")).await.unwrap());

    tmux.kill_window(&target("alice:demo-p7")).await.unwrap();
    assert!(!tmux.has_window(&target("alice:demo-p7")).await.unwrap());
    assert!(tmux.kill_window(&target("alice:demo-p7")).await.is_err());
}

#[tokio::test]
async fn new_window_requires_session() {
    let tmux = FakeTmux::new();
    let err = tmux
        .new_window("ghost", "w", Path::new("/"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::CommandFailed { .. }));
}

#[tokio::test]
async fn keys_literal_text_and_options_land_on_window() {
    let tmux = FakeTmux::new();
    tmux.add_window("alice:demo-p7");
    let t = target("alice:demo-p7");

    tmux.send_keys(&t, "clear", true).await.unwrap();
    tmux.send_literal(&t, "ls\n").await.unwrap();
    tmux.set_option(&t, "remain-on-exit", "on").await.unwrap();
    tmux.pipe_pane(&t, Path::new("/tmp/x.log")).await.unwrap();
    tmux.resize_window(&t, 40, 120).await.unwrap();

    let window = tmux.window("alice:demo-p7").unwrap();
    assert_eq!(window.keys, vec!["clear", "Enter"]);
    assert_eq!(window.literal, vec!["ls\n"]);
    assert_eq!(window.options.get("remain-on-exit").map(String::as_str), Some("on"));
    assert_eq!(window.pipe, Some(PathBuf::from("/tmp/x.log")));
    assert_eq!(window.size, Some((40, 120)));
}

#[tokio::test]
async fn injected_failures() {
    let tmux = FakeTmux::new();
    tmux.new_session("alice", Path::new("/")).await.unwrap();
    tmux.fail_window("broken");
    tmux.paneless_window("empty");

    assert!(tmux.new_window("alice", "broken", Path::new("/")).await.is_err());
    tmux.new_window("alice", "empty", Path::new("/")).await.unwrap();
    assert_eq!(tmux.pane_count(&target("alice:empty")).await.unwrap(), 0);

    tmux.set_installed(false);
    assert!(tmux.ensure_installed().await.unwrap_err().is_not_installed());
    assert!(tmux.list_sessions().await.unwrap_err().is_not_installed());
}

#[tokio::test]
async fn clones_share_state_and_record_accounts() {
    let tmux = FakeTmux::new();
    let alice = tmux.for_account(Some("alice"));
    alice.add_window("alice:w");
    alice.list_sessions().await.unwrap();
    tmux.list_sessions().await.unwrap();

    assert_eq!(tmux.targets(), vec!["alice:w"]);
    assert_eq!(tmux.accounts(), vec![Some("alice".to_string()), None]);
    assert!(tmux.mutations().is_empty());
    assert_eq!(alice.account(), Some("alice"));

    tmux.clear_calls();
    assert!(tmux.calls().is_empty());
    assert!(tmux.accounts().is_empty());
}
