// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sb-core: shared vocabulary of the session broker

pub mod frame;
pub mod id;
pub mod naming;
pub mod owner;
pub mod session;
pub mod target;
pub mod tool;
pub mod workspace;

pub use frame::Frame;
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use naming::{parse_window_name, session_name, slugify, window_name, GeneratedWindow, WindowKey};
pub use owner::{Identity, Owner, UserId};
pub use session::{SessionFilter, SessionId, SessionKind, SessionSummary};
pub use target::{TargetParseError, WindowTarget};
pub use tool::{apply_permission_mode, ResolvedCommand, Tool, ToolCommands, ToolError};
pub use workspace::{Workspace, WorkspaceId};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
