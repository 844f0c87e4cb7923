// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_and_displays_session_window() {
    let target: WindowTarget = "alice:demo-p7".parse().unwrap();
    assert_eq!(target, WindowTarget::new("alice", "demo-p7"));
    assert_eq!(target.to_string(), "alice:demo-p7");
}

#[test]
fn window_part_keeps_later_colons() {
    let target: WindowTarget = "s:w:x".parse().unwrap();
    assert_eq!(target.window, "w:x");
}

#[yare::parameterized(
    no_colon      = { "alice" },
    empty_session = { ":demo" },
    empty_window  = { "alice:" },
    blank         = { "  " },
)]
fn rejects_malformed(raw: &str) {
    assert!(raw.parse::<WindowTarget>().is_err());
}

#[test]
fn serializes_as_plain_string() {
    let target = WindowTarget::new("alice", "demo-p7");
    let json = serde_json::to_string(&target).unwrap();
    assert_eq!(json, "\"alice:demo-p7\"");
    let back: WindowTarget = serde_json::from_str(&json).unwrap();
    assert_eq!(back, target);
    assert!(serde_json::from_str::<WindowTarget>("\"nope\"").is_err());
}
