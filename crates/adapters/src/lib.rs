// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for tmux and pseudo-terminals

mod env;
pub mod pty;
pub mod subprocess;
pub mod tmux;
pub mod traced;

pub use pty::{NativePtyHost, PtyError, PtyHost, PtyProcess, PtySpec};
pub use tmux::{GatewayError, TmuxCli, TmuxGateway, TmuxOutput, WindowInfo};
pub use traced::TracedTmux;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use pty::FakePtyHost;
#[cfg(any(test, feature = "test-support"))]
pub use tmux::{FakeTmux, FakeWindow, TmuxCall};
