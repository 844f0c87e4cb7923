// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Starts sessions: attach clients in ptys, or pipe-backed tails

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::handle::{Backing, SessionHandle, SessionMeta};
use crate::registry::{RegisterError, Registry};
use crate::relay::{self, TailTiming};
use sb_adapters::{PtyError, PtyHost, PtySpec, TmuxGateway};
use sb_core::{SessionId, Tool, UserId, WindowTarget, Workspace};
use std::sync::Arc;

/// Everything needed to start one session on a resolved window.
#[derive(Debug, Clone)]
pub(crate) struct LaunchRequest {
    pub id: SessionId,
    pub owner: UserId,
    pub workspace: Workspace,
    pub account: Option<String>,
    pub tool: Option<Tool>,
    pub command: String,
    pub target: WindowTarget,
    /// The window was created for this request.
    pub created: bool,
    /// The caller named the window.
    pub explicit_target: bool,
    pub issue_id: Option<u64>,
    pub rows: u16,
    pub cols: u16,
    pub persistent: bool,
    /// Exported into the pane before the command runs.
    pub env: Vec<(String, String)>,
}

impl LaunchRequest {
    fn meta(&self) -> SessionMeta {
        SessionMeta {
            id: self.id.clone(),
            owner: self.owner,
            workspace: self.workspace.id,
            tool: self.tool,
            command: self.command.clone(),
            account: self.account.clone(),
            target: self.target.clone(),
            issue_id: self.issue_id,
        }
    }
}

fn register_error(e: RegisterError) -> BrokerError {
    match e {
        RegisterError::TargetInUse { target, .. } => BrokerError::TargetInUse(target),
        RegisterError::DuplicateId(id) => {
            BrokerError::InvalidRequest(format!("session id {id} already in use"))
        }
    }
}

fn is_env_name(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) struct Launcher<G, P> {
    gateway: G,
    pty: P,
    registry: Arc<Registry>,
    config: Arc<BrokerConfig>,
}

impl<G: TmuxGateway, P: PtyHost> Launcher<G, P> {
    pub(crate) fn new(
        gateway: G,
        pty: P,
        registry: Arc<Registry>,
        config: Arc<BrokerConfig>,
    ) -> Self {
        Self {
            gateway,
            pty,
            registry,
            config,
        }
    }

    fn timing(&self) -> TailTiming {
        TailTiming {
            poll: self.config.poll_interval,
            liveness: self.config.liveness_interval,
            wait: self.config.pipe_wait,
        }
    }

    /// Start a session on `req.target` and register it.
    pub(crate) async fn launch(
        &self,
        req: LaunchRequest,
    ) -> Result<Arc<SessionHandle>, BrokerError> {
        let gateway = self.gateway.for_account(req.account.as_deref());
        gateway.ensure_installed().await?;
        match gateway.pane_count(&req.target).await {
            Ok(0) => return Err(BrokerError::NoPane(req.target)),
            Ok(_) => {}
            Err(e) if e.is_not_installed() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(target = %req.target, error = %e, "cannot count panes");
                return Err(BrokerError::NoPane(req.target));
            }
        }

        let handle = if req.persistent {
            self.launch_persistent(&gateway, &req).await?
        } else {
            self.launch_transient(&gateway, &req)?
        };
        self.bootstrap(&gateway, &req).await;

        tracing::info!(
            session_id = %req.id,
            target = %req.target,
            kind = ?handle.kind(),
            account = ?req.account,
            created = req.created,
            "session launched"
        );
        Ok(handle)
    }

    fn launch_transient(
        &self,
        gateway: &G,
        req: &LaunchRequest,
    ) -> Result<Arc<SessionHandle>, BrokerError> {
        let spec = PtySpec::new(gateway.attach_argv(&req.target))
            .cwd(req.workspace.start_dir(&self.config.instance_dir))
            .env_remove("TMUX")
            .env("TERM", "xterm-256color")
            .size(req.rows, req.cols);
        let process = self.pty.spawn(&spec)?;

        let (reader, writer) = match process.take_reader().and_then(|r| Ok((r, process.take_writer()?))) {
            Ok(pair) => pair,
            Err(e) => {
                process.terminate();
                return Err(e.into());
            }
        };

        let (handle, tx) = SessionHandle::new(
            req.meta(),
            Backing::transient(process, writer),
            self.config.queue_capacity,
        );
        if let Err(e) = self.registry.register(Arc::clone(&handle)) {
            handle.terminate();
            return Err(register_error(e));
        }
        if let Err(e) = relay::spawn_pty_reader(
            Arc::clone(&handle),
            reader,
            tx,
            Arc::clone(&self.registry),
        ) {
            self.registry.remove(handle.id());
            handle.terminate();
            return Err(PtyError::Io(e.to_string()).into());
        }
        Ok(handle)
    }

    async fn launch_persistent(
        &self,
        gateway: &G,
        req: &LaunchRequest,
    ) -> Result<Arc<SessionHandle>, BrokerError> {
        std::fs::create_dir_all(&self.config.pipes_dir)?;
        let handle = self.attach_pipe(req.meta(), gateway.clone())?;

        if let Err(e) = gateway
            .set_option(&req.target, "remain-on-exit", "on")
            .await
        {
            tracing::warn!(target = %req.target, error = %e, "cannot set remain-on-exit");
        }
        if let Some(pipe) = handle.pipe_file() {
            if let Err(e) = gateway.pipe_pane(&req.target, pipe).await {
                self.registry.remove(handle.id());
                handle.terminate();
                return Err(e.into());
            }
        }
        if let Err(e) = gateway.resize_window(&req.target, req.rows, req.cols).await {
            tracing::debug!(target = %req.target, error = %e, "initial resize failed");
        }
        Ok(handle)
    }

    /// Register a pipe-backed handle that tails from the file's current end.
    pub(crate) fn attach_pipe(
        &self,
        meta: SessionMeta,
        gateway: G,
    ) -> Result<Arc<SessionHandle>, BrokerError> {
        let pipe = self.config.pipe_file(&meta.id);
        let offset = std::fs::metadata(&pipe).map(|m| m.len()).unwrap_or(0);
        let (handle, tx) = SessionHandle::new(
            meta,
            Backing::persistent(pipe, offset),
            self.config.queue_capacity,
        );
        self.registry
            .register(Arc::clone(&handle))
            .map_err(register_error)?;

        if let Err(e) = relay::spawn_pipe_tail(
            Arc::clone(&handle),
            tx,
            Arc::clone(&self.registry),
            gateway,
            tokio::runtime::Handle::current(),
            self.timing(),
        ) {
            self.registry.remove(handle.id());
            handle.terminate();
            return Err(e.into());
        }
        Ok(handle)
    }

    /// Seed the pane. A fresh (or implicitly chosen, or foreign-account)
    /// window gets env exports and the command; a reused explicit window
    /// is only cleared. Failures are logged, never returned.
    async fn bootstrap(&self, gateway: &G, req: &LaunchRequest) {
        let foreign = req.account.is_some() && req.account != self.config.service_account;
        let full = req.created || !req.explicit_target || foreign;

        let mut lines = Vec::new();
        if full {
            for (key, value) in &req.env {
                if is_env_name(key) {
                    lines.push(format!("export {}={}", key, shell_words::quote(value)));
                } else {
                    tracing::warn!(key = %key, "skipping invalid environment variable name");
                }
            }
        }
        lines.push("clear".to_string());
        if full {
            lines.push(req.command.clone());
        }

        for line in lines {
            if let Err(e) = gateway.send_keys(&req.target, &line, true).await {
                tracing::warn!(target = %req.target, error = %e, "bootstrap send-keys failed");
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
