// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Find-or-create tmux windows for (owner, workspace) pairs

use sb_adapters::{GatewayError, TmuxGateway};
use sb_core::{
    parse_window_name, session_name, window_name, Owner, WindowKey, WindowTarget, Workspace,
    WorkspaceId,
};
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredWindow {
    pub target: WindowTarget,
    /// True only when this call created the window.
    pub created: bool,
    pub panes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SyncReport {
    pub created: Vec<WindowTarget>,
    pub removed: Vec<WindowTarget>,
}

/// Resolves windows on one account's tmux server.
pub struct WindowResolver<G> {
    gateway: G,
    instance_dir: PathBuf,
}

impl<G: TmuxGateway> WindowResolver<G> {
    pub fn new(gateway: G, instance_dir: impl Into<PathBuf>) -> Self {
        Self {
            gateway,
            instance_dir: instance_dir.into(),
        }
    }

    /// Make sure the owner's session has `window` (default: the
    /// workspace window), creating session and window as needed.
    ///
    /// Repeat calls return the same target with `created = false` and
    /// issue no mutating tmux command.
    pub async fn ensure(
        &self,
        owner: &Owner,
        workspace: &Workspace,
        window: Option<&str>,
    ) -> Result<EnsuredWindow, GatewayError> {
        let session = session_name(owner);
        let window = match window {
            Some(name) => name.to_string(),
            None => window_name(workspace, &WindowKey::Workspace),
        };

        self.ensure_session(&session).await?;

        if let Some(existing) = self.find_window(&session, &window).await? {
            return Ok(existing);
        }

        let start_dir = workspace.start_dir(&self.instance_dir);
        match self.gateway.new_window(&session, &window, &start_dir).await {
            Ok(info) => {
                tracing::info!(target = %info.target, workspace = workspace.id, "created window");
                Ok(EnsuredWindow {
                    target: info.target,
                    created: true,
                    panes: info.panes,
                })
            }
            // Another request may have created it in the meantime
            Err(e) => match self.find_window(&session, &window).await? {
                Some(existing) => Ok(existing),
                None => Err(e),
            },
        }
    }

    async fn ensure_session(&self, session: &str) -> Result<(), GatewayError> {
        if self.gateway.list_sessions().await?.iter().any(|s| s == session) {
            return Ok(());
        }
        if let Err(e) = std::fs::create_dir_all(&self.instance_dir) {
            tracing::warn!(dir = %self.instance_dir.display(), error = %e, "cannot create instance dir");
        }
        match self.gateway.new_session(session, &self.instance_dir).await {
            Ok(()) => {
                tracing::info!(session, "created tmux session");
                Ok(())
            }
            Err(e) if e.is_not_installed() => Err(e),
            Err(e) => {
                if self.gateway.list_sessions().await?.iter().any(|s| s == session) {
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn find_window(
        &self,
        session: &str,
        window: &str,
    ) -> Result<Option<EnsuredWindow>, GatewayError> {
        Ok(self
            .gateway
            .list_windows(session)
            .await?
            .into_iter()
            .find(|w| w.target.window == window)
            .map(|w| EnsuredWindow {
                target: w.target,
                created: false,
                panes: w.panes,
            }))
    }

    /// Reconcile generated windows in the owner's session with `desired`.
    ///
    /// Creates each desired workspace's default window and kills generated
    /// windows of workspaces no longer desired. Windows whose names were
    /// not generated by the broker are left alone.
    pub async fn sync(
        &self,
        owner: &Owner,
        desired: &[Workspace],
    ) -> Result<SyncReport, GatewayError> {
        let mut report = SyncReport::default();
        for workspace in desired {
            let ensured = self.ensure(owner, workspace, None).await?;
            if ensured.created {
                report.created.push(ensured.target);
            }
        }

        let keep: HashSet<WorkspaceId> = desired.iter().map(|w| w.id).collect();
        let session = session_name(owner);
        for window in self.gateway.list_windows(&session).await? {
            let Some(generated) = parse_window_name(&window.target.window) else {
                continue;
            };
            if keep.contains(&generated.workspace_id) {
                continue;
            }
            match self.gateway.kill_window(&window.target).await {
                Ok(()) => report.removed.push(window.target),
                Err(e) => {
                    tracing::warn!(target = %window.target, error = %e, "failed to remove stale window")
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "windows_tests.rs"]
mod tests;
