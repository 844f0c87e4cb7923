// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced gateway wrapper for consistent observability

use crate::tmux::{GatewayError, TmuxGateway, TmuxOutput, WindowInfo};
use async_trait::async_trait;
use sb_core::WindowTarget;
use std::path::Path;
use tracing::Instrument;

/// Wrapper that adds tracing to any TmuxGateway
#[derive(Clone)]
pub struct TracedTmux<G> {
    inner: G,
}

impl<G> TracedTmux<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

fn log_failure<T>(result: &Result<T, GatewayError>, op: &str, target: &str) {
    if let Err(e) = result {
        match e {
            GatewayError::NotInstalled(_) => tracing::error!(op, target, error = %e, "tmux missing"),
            _ => tracing::warn!(op, target, error = %e, "tmux command failed"),
        }
    }
}

#[async_trait]
impl<G: TmuxGateway> TmuxGateway for TracedTmux<G> {
    fn account(&self) -> Option<&str> {
        self.inner.account()
    }

    fn for_account(&self, account: Option<&str>) -> Self {
        Self::new(self.inner.for_account(account))
    }

    fn attach_argv(&self, target: &WindowTarget) -> Vec<String> {
        self.inner.attach_argv(target)
    }

    async fn ensure_installed(&self) -> Result<(), GatewayError> {
        let result = self.inner.ensure_installed().await;
        log_failure(&result, "ensure_installed", "");
        result
    }

    async fn run(&self, args: &[&str]) -> Result<TmuxOutput, GatewayError> {
        let result = self.inner.run(args).await;
        tracing::trace!(
            args = ?args,
            account = self.inner.account(),
            code = result.as_ref().map(|o| o.code).ok(),
            "tmux run"
        );
        result
    }

    async fn list_sessions(&self) -> Result<Vec<String>, GatewayError> {
        let result = self.inner.list_sessions().await;
        tracing::trace!(
            account = self.inner.account(),
            count = result.as_ref().map(Vec::len).ok(),
            "listed sessions"
        );
        result
    }

    async fn new_session(&self, name: &str, start_dir: &Path) -> Result<(), GatewayError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.new_session(name, start_dir).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "session created"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "new-session failed"),
            }
            result
        }
        .instrument(tracing::info_span!(
            "tmux.new_session",
            name,
            account = self.inner.account(),
            start_dir = %start_dir.display()
        ))
        .await
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, GatewayError> {
        let result = self.inner.list_windows(session).await;
        log_failure(&result, "list_windows", session);
        result
    }

    async fn list_all_windows(&self) -> Result<Vec<WindowTarget>, GatewayError> {
        let result = self.inner.list_all_windows().await;
        tracing::debug!(
            account = self.inner.account(),
            count = result.as_ref().map(Vec::len).ok(),
            "listed all windows"
        );
        log_failure(&result, "list_all_windows", "");
        result
    }

    async fn new_window(
        &self,
        session: &str,
        name: &str,
        start_dir: &Path,
    ) -> Result<WindowInfo, GatewayError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.new_window(session, name, start_dir).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(info) => tracing::info!(elapsed_ms, panes = info.panes, "window created"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "new-window failed"),
            }
            result
        }
        .instrument(tracing::info_span!(
            "tmux.new_window",
            session,
            name,
            account = self.inner.account(),
            start_dir = %start_dir.display()
        ))
        .await
    }

    async fn select_window(&self, target: &WindowTarget) -> Result<(), GatewayError> {
        let result = self.inner.select_window(target).await;
        log_failure(&result, "select_window", &target.to_string());
        result
    }

    async fn pane_count(&self, target: &WindowTarget) -> Result<usize, GatewayError> {
        let result = self.inner.pane_count(target).await;
        log_failure(&result, "pane_count", &target.to_string());
        result
    }

    async fn has_window(&self, target: &WindowTarget) -> Result<bool, GatewayError> {
        let result = self.inner.has_window(target).await;
        tracing::trace!(target = %target, exists = ?result.as_ref().ok(), "checked window");
        result
    }

    async fn send_keys(
        &self,
        target: &WindowTarget,
        keys: &str,
        enter: bool,
    ) -> Result<(), GatewayError> {
        tracing::info_span!("tmux.send_keys", target = %target)
            .in_scope(|| tracing::debug!(keys_len = keys.len(), enter, "sending"));
        let result = self.inner.send_keys(target, keys, enter).await;
        log_failure(&result, "send_keys", &target.to_string());
        result
    }

    async fn send_literal(&self, target: &WindowTarget, text: &str) -> Result<(), GatewayError> {
        let result = self.inner.send_literal(target, text).await;
        log_failure(&result, "send_literal", &target.to_string());
        result
    }

    async fn resize_window(
        &self,
        target: &WindowTarget,
        rows: u16,
        cols: u16,
    ) -> Result<(), GatewayError> {
        let result = self.inner.resize_window(target, rows, cols).await;
        tracing::debug!(target = %target, rows, cols, ok = result.is_ok(), "resized window");
        result
    }

    async fn kill_window(&self, target: &WindowTarget) -> Result<(), GatewayError> {
        let result = self.inner.kill_window(target).await;
        tracing::info_span!("tmux.kill_window", target = %target).in_scope(|| match &result {
            Ok(()) => tracing::info!("killed"),
            Err(e) => tracing::warn!(error = %e, "kill failed (may be expected)"),
        });
        result
    }

    async fn set_option(
        &self,
        target: &WindowTarget,
        option: &str,
        value: &str,
    ) -> Result<(), GatewayError> {
        let result = self.inner.set_option(target, option, value).await;
        log_failure(&result, "set_option", &target.to_string());
        result
    }

    async fn pipe_pane(&self, target: &WindowTarget, file: &Path) -> Result<(), GatewayError> {
        let result = self.inner.pipe_pane(target, file).await;
        match &result {
            Ok(()) => tracing::info!(target = %target, file = %file.display(), "piping pane output"),
            Err(e) => tracing::warn!(target = %target, error = %e, "pipe-pane failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
