// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux command gateway

mod cli;

pub use cli::TmuxCli;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTmux, FakeWindow, TmuxCall};

use async_trait::async_trait;
use sb_core::WindowTarget;
use std::path::Path;
use thiserror::Error;

/// Errors from tmux operations
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The tmux (or sudo) binary is missing. Never worth retrying.
    #[error("{0} is not installed or not on PATH")]
    NotInstalled(String),
    /// tmux ran and exited non-zero.
    #[error("{command} exited with {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("tmux invocation failed: {0}")]
    Io(String),
}

impl GatewayError {
    pub fn is_not_installed(&self) -> bool {
        matches!(self, GatewayError::NotInstalled(_))
    }
}

/// Raw result of one tmux invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TmuxOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub code: i32,
}

impl TmuxOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Turn a non-zero exit into [`GatewayError::CommandFailed`].
    pub fn check(self, command: &str) -> Result<Self, GatewayError> {
        if self.success() {
            Ok(self)
        } else {
            Err(GatewayError::CommandFailed {
                command: command.to_string(),
                code: self.code,
                stderr: self.stderr.join("\n"),
            })
        }
    }

    /// tmux reports a missing server or session rather than an empty list.
    pub fn is_missing_server(&self) -> bool {
        self.stderr.iter().any(|line| {
            line.contains("no server running")
                || line.contains("error connecting to")
                || line.contains("can't find session")
                || line.contains("no current session")
        })
    }
}

/// One window as reported by `list-windows`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub target: WindowTarget,
    pub panes: usize,
    /// Creation time, seconds since the epoch.
    pub created: Option<u64>,
}

/// Format string shared by `list-windows` and `new-window -P`.
pub(crate) const WINDOW_FORMAT: &str = "#{session_name}\t#{window_name}\t#{window_panes}\t#{window_created}";

impl WindowInfo {
    /// Parse one line produced with [`WINDOW_FORMAT`].
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split('\t');
        let session = fields.next()?;
        let window = fields.next()?;
        if session.is_empty() || window.is_empty() {
            return None;
        }
        let panes = fields.next().and_then(|p| p.trim().parse().ok()).unwrap_or(0);
        let created = fields.next().and_then(|c| c.trim().parse().ok());
        Some(Self {
            target: WindowTarget::new(session, window),
            panes,
            created,
        })
    }
}

/// Typed access to one tmux server.
///
/// Each implementation is bound to an OS account; [`TmuxGateway::for_account`]
/// yields a gateway for another account's server.
#[async_trait]
pub trait TmuxGateway: Clone + Send + Sync + 'static {
    /// Account whose server this gateway talks to (`None` = our own).
    fn account(&self) -> Option<&str>;

    /// Same gateway, bound to `account`'s server.
    fn for_account(&self, account: Option<&str>) -> Self;

    /// argv of a client attaching to `target`.
    fn attach_argv(&self, target: &WindowTarget) -> Vec<String>;

    /// Fails with [`GatewayError::NotInstalled`] when tmux is absent.
    async fn ensure_installed(&self) -> Result<(), GatewayError>;

    /// Run an arbitrary tmux command; a non-zero exit is not an error here.
    async fn run(&self, args: &[&str]) -> Result<TmuxOutput, GatewayError>;

    /// Session names; empty when no server is running.
    async fn list_sessions(&self) -> Result<Vec<String>, GatewayError>;

    /// Create a detached session with mouse support disabled.
    async fn new_session(&self, name: &str, start_dir: &Path) -> Result<(), GatewayError>;

    /// Windows of one session; empty when the session does not exist.
    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, GatewayError>;

    /// Every window on the server; empty when no server is running.
    async fn list_all_windows(&self) -> Result<Vec<WindowTarget>, GatewayError>;

    /// Create a detached window in an existing session.
    async fn new_window(
        &self,
        session: &str,
        name: &str,
        start_dir: &Path,
    ) -> Result<WindowInfo, GatewayError>;

    async fn select_window(&self, target: &WindowTarget) -> Result<(), GatewayError>;

    async fn pane_count(&self, target: &WindowTarget) -> Result<usize, GatewayError>;

    async fn has_window(&self, target: &WindowTarget) -> Result<bool, GatewayError>;

    /// Send keys (key names interpreted), optionally followed by Enter.
    async fn send_keys(
        &self,
        target: &WindowTarget,
        keys: &str,
        enter: bool,
    ) -> Result<(), GatewayError>;

    /// Send text literally (no key name interpretation).
    async fn send_literal(&self, target: &WindowTarget, text: &str) -> Result<(), GatewayError>;

    async fn resize_window(
        &self,
        target: &WindowTarget,
        rows: u16,
        cols: u16,
    ) -> Result<(), GatewayError>;

    async fn kill_window(&self, target: &WindowTarget) -> Result<(), GatewayError>;

    async fn set_option(
        &self,
        target: &WindowTarget,
        option: &str,
        value: &str,
    ) -> Result<(), GatewayError>;

    /// Append everything the pane prints to `file`.
    async fn pipe_pane(&self, target: &WindowTarget, file: &Path) -> Result<(), GatewayError>;
}
