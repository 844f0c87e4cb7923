// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn target(s: &str) -> WindowTarget {
    s.parse().unwrap()
}

#[test]
fn record_overwrites_previous_tool() {
    let tags = WindowTags::in_memory();
    tags.record(&target("alice:demo-p7"), "codex").unwrap();
    tags.record(&target("alice:demo-p7"), "claude").unwrap();
    assert_eq!(tags.get(&target("alice:demo-p7")).as_deref(), Some("claude"));
    assert_eq!(tags.get(&target("alice:other")), None);
}

#[test]
fn prune_keeps_only_live_windows() {
    let tags = WindowTags::in_memory();
    tags.record(&target("alice:demo-p7"), "claude").unwrap();
    tags.record(&target("alice:api-p8"), "codex").unwrap();
    tags.record(&target("bob:demo-p7"), "shell").unwrap();

    let live = [target("alice:demo-p7")];
    assert_eq!(tags.prune(&live).unwrap(), 2);
    assert!(tags.get(&target("alice:demo-p7")).is_some());
    assert!(tags.get(&target("bob:demo-p7")).is_none());
    assert_eq!(tags.prune(&live).unwrap(), 0);
}

#[test]
fn remove_drops_named_windows() {
    let tags = WindowTags::in_memory();
    tags.record(&target("alice:demo-p7"), "claude").unwrap();
    tags.record(&target("alice:api-p8"), "codex").unwrap();

    assert_eq!(tags.remove(&[target("alice:api-p8"), target("x:y")]).unwrap(), 1);
    assert!(tags.get(&target("alice:api-p8")).is_none());
}

#[test]
fn file_backed_tags_persist() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("window-tools.json");
    {
        let tags = WindowTags::open(&path).unwrap();
        tags.record(&target("alice:demo-p7"), "claude").unwrap();
    }
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"alice:demo-p7\""));

    let tags = WindowTags::open(&path).unwrap();
    assert_eq!(tags.get(&target("alice:demo-p7")).as_deref(), Some("claude"));
}
