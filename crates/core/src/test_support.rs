// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{Identity, Owner, Workspace};
use std::path::Path;

/// `alice` (user 1) as both owner profile and caller identity.
pub fn alice() -> (Owner, Identity) {
    (Owner::new(1).with_username("alice"), Identity::user(1))
}

/// `bob` (user 2).
pub fn bob() -> (Owner, Identity) {
    (Owner::new(2).with_username("bob"), Identity::user(2))
}

/// Workspace 7 named `demo`, rooted under `dir`.
pub fn demo_workspace(dir: &Path) -> Workspace {
    Workspace::new(7, "demo").with_local_path(dir.join("demo"))
}
