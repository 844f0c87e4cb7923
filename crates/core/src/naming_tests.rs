// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    plain         = { "demo",              "demo" },
    mixed_case    = { "My Project",        "my-project" },
    separators    = { "a.b/c\\d:e",        "a-b-c-d-e" },
    collapse      = { "a  --  b",          "a-b" },
    trim          = { "--edge--",          "edge" },
    underscore    = { "snake_case",        "snake_case" },
    only_symbols  = { "...",               "" },
)]
fn slugify_cases(input: &str, expected: &str) {
    assert_eq!(slugify(input), expected);
}

#[test]
fn session_name_prefers_display_name_then_username_then_id() {
    let owner = Owner::new(9)
        .with_display_name("Alice Doe")
        .with_username("alice");
    assert_eq!(session_name(&owner), "alice-doe");

    let owner = Owner::new(9).with_display_name("!!!").with_username("alice");
    assert_eq!(session_name(&owner), "alice");

    assert_eq!(session_name(&Owner::new(9)), "user-9");
}

#[yare::parameterized(
    workspace = { WindowKey::Workspace,                      "demo-p7" },
    issue     = { WindowKey::Issue(713),                     "demo-p7-i713" },
    scratch   = { WindowKey::Scratch("a1b2c3".to_string()),  "demo-p7-a1b2c3" },
)]
fn window_names(key: WindowKey, expected: &str) {
    let ws = Workspace::new(7, "Demo");
    assert_eq!(window_name(&ws, &key), expected);
}

#[test]
fn window_name_for_unnamed_workspace() {
    let ws = Workspace::new(4, " ");
    assert_eq!(window_name(&ws, &WindowKey::Workspace), "project-p4");
}

#[yare::parameterized(
    workspace   = { "demo-p7",          7, WindowKey::Workspace },
    issue       = { "demo-p7-i713",     7, WindowKey::Issue(713) },
    scratch     = { "my-app-p12-0fa9c1", 12, WindowKey::Scratch("0fa9c1".to_string()) },
    slug_has_p  = { "a-p1-p2",          2, WindowKey::Workspace },
)]
fn parse_generated_names(name: &str, workspace_id: u64, key: WindowKey) {
    assert_eq!(
        parse_window_name(name),
        Some(GeneratedWindow { workspace_id, key })
    );
}

#[yare::parameterized(
    user_window   = { "scratchpad" },
    no_slug       = { "p7" },
    bad_suffix    = { "demo-p7-xyz" },
    long_hex      = { "demo-p7-a1b2c3d" },
    upper_hex     = { "demo-p7-A1B2C3" },
    empty_issue   = { "demo-p7-i" },
    no_workspace  = { "demo-i7" },
)]
fn parse_rejects_foreign_names(name: &str) {
    assert_eq!(parse_window_name(name), None);
}
