// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory tmux server for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{GatewayError, TmuxGateway, TmuxOutput, WindowInfo};
use async_trait::async_trait;
use parking_lot::Mutex;
use sb_core::WindowTarget;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TmuxCall {
    Run { args: Vec<String> },
    ListSessions,
    NewSession { name: String, start_dir: PathBuf },
    ListWindows { session: String },
    ListAllWindows,
    NewWindow { session: String, name: String, start_dir: PathBuf },
    SelectWindow { target: String },
    PaneCount { target: String },
    HasWindow { target: String },
    SendKeys { target: String, keys: String, enter: bool },
    SendLiteral { target: String, text: String },
    ResizeWindow { target: String, rows: u16, cols: u16 },
    KillWindow { target: String },
    SetOption { target: String, option: String, value: String },
    PipePane { target: String, file: PathBuf },
}

impl TmuxCall {
    /// Whether the call changes server state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            TmuxCall::NewSession { .. }
                | TmuxCall::NewWindow { .. }
                | TmuxCall::SendKeys { .. }
                | TmuxCall::SendLiteral { .. }
                | TmuxCall::ResizeWindow { .. }
                | TmuxCall::KillWindow { .. }
                | TmuxCall::SetOption { .. }
                | TmuxCall::PipePane { .. }
        )
    }
}

/// Fake window state
#[derive(Debug, Clone, Default)]
pub struct FakeWindow {
    pub name: String,
    pub start_dir: PathBuf,
    pub panes: usize,
    pub selected: bool,
    /// Keys sent with `send_keys`, each followed by `"Enter"` when requested.
    pub keys: Vec<String>,
    pub literal: Vec<String>,
    pub options: BTreeMap<String, String>,
    pub pipe: Option<PathBuf>,
    pub size: Option<(u16, u16)>,
}

#[derive(Default)]
struct FakeSessionState {
    start_dir: PathBuf,
    windows: Vec<FakeWindow>,
    options: BTreeMap<String, String>,
}

struct FakeServer {
    sessions: BTreeMap<String, FakeSessionState>,
    calls: Vec<TmuxCall>,
    accounts: Vec<Option<String>>,
    installed: bool,
    failing_windows: HashSet<String>,
    paneless_windows: HashSet<String>,
}

/// Fake tmux gateway for testing
///
/// Clones share one server; `for_account` only changes the recorded account.
#[derive(Clone)]
pub struct FakeTmux {
    inner: Arc<Mutex<FakeServer>>,
    account: Option<String>,
}

impl Default for FakeTmux {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeServer {
                sessions: BTreeMap::new(),
                calls: Vec::new(),
                accounts: Vec::new(),
                installed: true,
                failing_windows: HashSet::new(),
                paneless_windows: HashSet::new(),
            })),
            account: None,
        }
    }
}

impl FakeTmux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<TmuxCall> {
        self.inner.lock().calls.clone()
    }

    /// Recorded calls that change server state.
    pub fn mutations(&self) -> Vec<TmuxCall> {
        self.calls().into_iter().filter(TmuxCall::is_mutation).collect()
    }

    /// Forget recorded calls and the accounts they were issued for.
    pub fn clear_calls(&self) {
        let mut inner = self.inner.lock();
        inner.calls.clear();
        inner.accounts.clear();
    }

    /// Accounts each call was issued for, in call order.
    pub fn accounts(&self) -> Vec<Option<String>> {
        self.inner.lock().accounts.clone()
    }

    /// Pretend tmux is (not) installed.
    pub fn set_installed(&self, installed: bool) {
        self.inner.lock().installed = installed;
    }

    /// Make `new_window` fail for this window name.
    pub fn fail_window(&self, name: &str) {
        self.inner.lock().failing_windows.insert(name.to_string());
    }

    /// Windows with this name are created without panes.
    pub fn paneless_window(&self, name: &str) {
        self.inner.lock().paneless_windows.insert(name.to_string());
    }

    /// Seed a live window, creating its session as needed.
    pub fn add_window(&self, target: &str) {
        let Ok(target) = target.parse::<WindowTarget>() else {
            return;
        };
        let mut inner = self.inner.lock();
        let session = inner.sessions.entry(target.session.clone()).or_default();
        if !session.windows.iter().any(|w| w.name == target.window) {
            session.windows.push(FakeWindow {
                name: target.window,
                panes: 1,
                ..FakeWindow::default()
            });
        }
    }

    /// Simulate a window disappearing outside the broker.
    pub fn remove_window(&self, target: &str) {
        let Ok(target) = target.parse::<WindowTarget>() else {
            return;
        };
        if let Some(session) = self.inner.lock().sessions.get_mut(&target.session) {
            session.windows.retain(|w| w.name != target.window);
        }
    }

    pub fn window(&self, target: &str) -> Option<FakeWindow> {
        let target = target.parse::<WindowTarget>().ok()?;
        self.inner
            .lock()
            .sessions
            .get(&target.session)?
            .windows
            .iter()
            .find(|w| w.name == target.window)
            .cloned()
    }

    pub fn session_names(&self) -> Vec<String> {
        self.inner.lock().sessions.keys().cloned().collect()
    }

    pub fn session_start_dir(&self, session: &str) -> Option<PathBuf> {
        Some(self.inner.lock().sessions.get(session)?.start_dir.clone())
    }

    pub fn session_option(&self, session: &str, option: &str) -> Option<String> {
        self.inner
            .lock()
            .sessions
            .get(session)?
            .options
            .get(option)
            .cloned()
    }

    /// Every window as a `session:window` string.
    pub fn targets(&self) -> Vec<String> {
        self.inner
            .lock()
            .sessions
            .iter()
            .flat_map(|(s, state)| state.windows.iter().map(move |w| format!("{s}:{}", w.name)))
            .collect()
    }

    fn record(&self, call: TmuxCall) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        inner.accounts.push(self.account.clone());
        if inner.installed {
            Ok(())
        } else {
            Err(GatewayError::NotInstalled("tmux".to_string()))
        }
    }

    fn with_window<T>(
        &self,
        target: &WindowTarget,
        f: impl FnOnce(&mut FakeWindow) -> T,
    ) -> Result<T, GatewayError> {
        let mut inner = self.inner.lock();
        inner
            .sessions
            .get_mut(&target.session)
            .and_then(|s| s.windows.iter_mut().find(|w| w.name == target.window))
            .map(f)
            .ok_or_else(|| GatewayError::CommandFailed {
                command: "tmux".to_string(),
                code: 1,
                stderr: format!("can't find window: {target}"),
            })
    }
}

#[async_trait]
impl TmuxGateway for FakeTmux {
    fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    fn for_account(&self, account: Option<&str>) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            account: account.map(str::to_string),
        }
    }

    fn attach_argv(&self, target: &WindowTarget) -> Vec<String> {
        vec![
            "tmux".to_string(),
            "attach-session".to_string(),
            "-t".to_string(),
            target.to_string(),
        ]
    }

    async fn ensure_installed(&self) -> Result<(), GatewayError> {
        if self.inner.lock().installed {
            Ok(())
        } else {
            Err(GatewayError::NotInstalled("tmux".to_string()))
        }
    }

    async fn run(&self, args: &[&str]) -> Result<TmuxOutput, GatewayError> {
        self.record(TmuxCall::Run {
            args: args.iter().map(|a| a.to_string()).collect(),
        })?;
        Ok(TmuxOutput::default())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, GatewayError> {
        self.record(TmuxCall::ListSessions)?;
        Ok(self.session_names())
    }

    async fn new_session(&self, name: &str, start_dir: &Path) -> Result<(), GatewayError> {
        self.record(TmuxCall::NewSession {
            name: name.to_string(),
            start_dir: start_dir.to_path_buf(),
        })?;
        let mut inner = self.inner.lock();
        if inner.sessions.contains_key(name) {
            return Err(GatewayError::CommandFailed {
                command: "tmux new-session".to_string(),
                code: 1,
                stderr: format!("duplicate session: {name}"),
            });
        }
        let mut session = FakeSessionState {
            start_dir: start_dir.to_path_buf(),
            ..FakeSessionState::default()
        };
        session.options.insert("mouse".to_string(), "off".to_string());
        session.windows.push(FakeWindow {
            name: "0".to_string(),
            start_dir: start_dir.to_path_buf(),
            panes: 1,
            ..FakeWindow::default()
        });
        inner.sessions.insert(name.to_string(), session);
        Ok(())
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, GatewayError> {
        self.record(TmuxCall::ListWindows {
            session: session.to_string(),
        })?;
        let inner = self.inner.lock();
        Ok(inner
            .sessions
            .get(session)
            .map(|s| {
                s.windows
                    .iter()
                    .map(|w| WindowInfo {
                        target: WindowTarget::new(session, &w.name),
                        panes: w.panes,
                        created: None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_all_windows(&self) -> Result<Vec<WindowTarget>, GatewayError> {
        self.record(TmuxCall::ListAllWindows)?;
        Ok(self
            .targets()
            .iter()
            .filter_map(|t| t.parse().ok())
            .collect())
    }

    async fn new_window(
        &self,
        session: &str,
        name: &str,
        start_dir: &Path,
    ) -> Result<WindowInfo, GatewayError> {
        self.record(TmuxCall::NewWindow {
            session: session.to_string(),
            name: name.to_string(),
            start_dir: start_dir.to_path_buf(),
        })?;
        let mut inner = self.inner.lock();
        if inner.failing_windows.contains(name) {
            return Err(GatewayError::CommandFailed {
                command: "tmux new-window".to_string(),
                code: 1,
                stderr: format!("create window failed: {name}"),
            });
        }
        let panes = if inner.paneless_windows.contains(name) { 0 } else { 1 };
        let state = inner
            .sessions
            .get_mut(session)
            .ok_or_else(|| GatewayError::CommandFailed {
                command: "tmux new-window".to_string(),
                code: 1,
                stderr: format!("can't find session: {session}"),
            })?;
        state.windows.push(FakeWindow {
            name: name.to_string(),
            start_dir: start_dir.to_path_buf(),
            panes,
            ..FakeWindow::default()
        });
        Ok(WindowInfo {
            target: WindowTarget::new(session, name),
            panes,
            created: None,
        })
    }

    async fn select_window(&self, target: &WindowTarget) -> Result<(), GatewayError> {
        self.record(TmuxCall::SelectWindow {
            target: target.to_string(),
        })?;
        let mut inner = self.inner.lock();
        let Some(session) = inner.sessions.get_mut(&target.session) else {
            return Err(GatewayError::CommandFailed {
                command: "tmux select-window".to_string(),
                code: 1,
                stderr: format!("can't find session: {}", target.session),
            });
        };
        if !session.windows.iter().any(|w| w.name == target.window) {
            return Err(GatewayError::CommandFailed {
                command: "tmux select-window".to_string(),
                code: 1,
                stderr: format!("can't find window: {}", target.window),
            });
        }
        for window in &mut session.windows {
            window.selected = window.name == target.window;
        }
        Ok(())
    }

    async fn pane_count(&self, target: &WindowTarget) -> Result<usize, GatewayError> {
        self.record(TmuxCall::PaneCount {
            target: target.to_string(),
        })?;
        self.with_window(target, |w| w.panes)
    }

    async fn has_window(&self, target: &WindowTarget) -> Result<bool, GatewayError> {
        self.record(TmuxCall::HasWindow {
            target: target.to_string(),
        })?;
        Ok(self.with_window(target, |_| ()).is_ok())
    }

    async fn send_keys(
        &self,
        target: &WindowTarget,
        keys: &str,
        enter: bool,
    ) -> Result<(), GatewayError> {
        self.record(TmuxCall::SendKeys {
            target: target.to_string(),
            keys: keys.to_string(),
            enter,
        })?;
        self.with_window(target, |w| {
            w.keys.push(keys.to_string());
            if enter {
                w.keys.push("Enter".to_string());
            }
        })
    }

    async fn send_literal(&self, target: &WindowTarget, text: &str) -> Result<(), GatewayError> {
        self.record(TmuxCall::SendLiteral {
            target: target.to_string(),
            text: text.to_string(),
        })?;
        self.with_window(target, |w| w.literal.push(text.to_string()))
    }

    async fn resize_window(
        &self,
        target: &WindowTarget,
        rows: u16,
        cols: u16,
    ) -> Result<(), GatewayError> {
        self.record(TmuxCall::ResizeWindow {
            target: target.to_string(),
            rows,
            cols,
        })?;
        self.with_window(target, |w| w.size = Some((rows, cols)))
    }

    async fn kill_window(&self, target: &WindowTarget) -> Result<(), GatewayError> {
        self.record(TmuxCall::KillWindow {
            target: target.to_string(),
        })?;
        self.with_window(target, |_| ())?;
        self.remove_window(&target.to_string());
        Ok(())
    }

    async fn set_option(
        &self,
        target: &WindowTarget,
        option: &str,
        value: &str,
    ) -> Result<(), GatewayError> {
        self.record(TmuxCall::SetOption {
            target: target.to_string(),
            option: option.to_string(),
            value: value.to_string(),
        })?;
        self.with_window(target, |w| {
            w.options.insert(option.to_string(), value.to_string());
        })
    }

    async fn pipe_pane(&self, target: &WindowTarget, file: &Path) -> Result<(), GatewayError> {
        self.record(TmuxCall::PipePane {
            target: target.to_string(),
            file: file.to_path_buf(),
        })?;
        self.with_window(target, |w| w.pipe = Some(file.to_path_buf()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
