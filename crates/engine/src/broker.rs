// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker facade: the operations clients call

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::handle::SessionHandle;
use crate::launcher::{LaunchRequest, Launcher};
use crate::recovery::{self, RecoveryReport};
use crate::registry::Registry;
use crate::relay::FrameStream;
use crate::windows::{EnsuredWindow, SyncReport, WindowResolver};
use sb_adapters::{PtyHost, TmuxGateway};
use sb_core::{
    window_name, IdGen, Identity, Owner, ResolvedCommand, SessionFilter, SessionId, SessionKind,
    SessionSummary, Tool, UserId, WindowKey, WindowTarget, Workspace, WorkspaceId,
};
use sb_storage::{NewRecord, RecordStore, SessionRecord, WindowTags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A request to start (or reuse) a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSession {
    pub workspace: Workspace,
    pub owner: Owner,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<u16>,
    /// `window` or `session:window`; only the window part is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmux_target: Option<String>,
    /// Reuse key: a live session for the same issue is returned instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
    /// Typed into a new session once it starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Run the command even in an existing explicit window.
    #[serde(skip)]
    relaunch: bool,
}

impl CreateSession {
    pub fn new(owner: Owner, workspace: Workspace) -> Self {
        Self {
            workspace,
            owner,
            tool: None,
            command: None,
            rows: None,
            cols: None,
            tmux_target: None,
            issue_id: None,
            persistent: None,
            permission_mode: None,
            initial_prompt: None,
            env: BTreeMap::new(),
            relaunch: false,
        }
    }

    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn size(mut self, rows: u16, cols: u16) -> Self {
        self.rows = Some(rows);
        self.cols = Some(cols);
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.tmux_target = Some(target.into());
        self
    }

    pub fn issue(mut self, issue_id: u64) -> Self {
        self.issue_id = Some(issue_id);
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = Some(persistent);
        self
    }

    pub fn permission_mode(mut self, mode: impl Into<String>) -> Self {
        self.permission_mode = Some(mode.into());
        self
    }

    pub fn initial_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.initial_prompt = Some(prompt.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedSession {
    pub session_id: SessionId,
    pub tmux_target: WindowTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// A live session was reused rather than started.
    pub existing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<Tool>,
}

/// Result of checking a record against tmux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub record_id: u64,
    pub exists: bool,
    /// This check flipped the record to inactive.
    pub marked_inactive: bool,
}

/// One persisted session plus how to reach it out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record: SessionRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub attach_command: String,
    pub resume_command: String,
    pub live: bool,
}

/// Adapter and storage dependencies of a broker.
pub struct BrokerDeps<G, P> {
    pub gateway: G,
    pub pty: P,
    pub store: Arc<dyn RecordStore>,
    pub tags: Arc<WindowTags>,
    pub ids: Arc<dyn IdGen>,
}

/// Live session state plus the operations over it.
pub struct Broker<G, P> {
    gateway: G,
    launcher: Launcher<G, P>,
    registry: Arc<Registry>,
    store: Arc<dyn RecordStore>,
    tags: Arc<WindowTags>,
    ids: Arc<dyn IdGen>,
    config: Arc<BrokerConfig>,
    recovery: OnceCell<RecoveryReport>,
}

/// Window part of a caller-supplied target.
fn explicit_window(target: &str) -> Option<String> {
    let window = match target.trim().split_once(':') {
        Some((_, window)) => window,
        None => target.trim(),
    };
    (!window.is_empty()).then(|| window.to_string())
}

fn same_program(handle: &SessionHandle, resolved: &ResolvedCommand) -> bool {
    match (handle.tool(), resolved.tool) {
        (Some(a), Some(b)) => a == b,
        _ => handle.command() == resolved.command,
    }
}

impl<G: TmuxGateway, P: PtyHost> Broker<G, P> {
    pub fn new(deps: BrokerDeps<G, P>, config: BrokerConfig) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(Registry::new());
        let launcher = Launcher::new(
            deps.gateway.clone(),
            deps.pty,
            Arc::clone(&registry),
            Arc::clone(&config),
        );
        Self {
            gateway: deps.gateway,
            launcher,
            registry,
            store: deps.store,
            tags: deps.tags,
            ids: deps.ids,
            config,
            recovery: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Gateway bound to the server hosting `account`'s sessions.
    fn gateway_for(&self, account: Option<&str>) -> G {
        self.gateway.for_account(account)
    }

    async fn ensure_recovered(&self) -> &RecoveryReport {
        self.recovery
            .get_or_init(|| {
                recovery::scan(
                    &self.gateway,
                    self.store.as_ref(),
                    &self.tags,
                    &self.registry,
                    &self.launcher,
                    &self.config,
                )
            })
            .await
    }

    /// Run recovery if it has not run yet and return its report.
    pub async fn recover(&self) -> RecoveryReport {
        self.ensure_recovered().await.clone()
    }

    /// Start a session, or return the live one for the same issue.
    pub async fn create_session(&self, req: CreateSession) -> Result<CreatedSession, BrokerError> {
        self.ensure_recovered().await;

        let resolved = self.config.tools.resolve(
            req.tool.as_deref(),
            req.command.as_deref(),
            req.permission_mode.as_deref(),
        )?;
        let account = self.config.accounts.resolve(&req.owner);
        let reported_account = account.clone().or_else(|| self.config.service_account.clone());
        let gateway = self.gateway_for(account.as_deref());
        gateway.ensure_installed().await?;

        if let Some(issue) = req.issue_id {
            if let Some(handle) = self
                .find_for_issue(req.owner.id, req.workspace.id, issue, &resolved)
                .await
            {
                tracing::info!(session_id = %handle.id(), issue, "reusing session for issue");
                return Ok(CreatedSession {
                    session_id: handle.id().clone(),
                    tmux_target: handle.target().clone(),
                    account: handle.account().map(str::to_string).or(reported_account),
                    existing: true,
                    tool: handle.tool(),
                });
            }
        }

        let resolver = WindowResolver::new(gateway, &self.config.instance_dir);
        let (window, explicit_target) = self
            .resolve_window(&resolver, &req, account.as_deref())
            .await?;

        let id = SessionId::new(self.ids.next());
        let launch = LaunchRequest {
            id: id.clone(),
            owner: req.owner.id,
            workspace: req.workspace.clone(),
            account: account.clone(),
            tool: resolved.tool,
            command: resolved.command.clone(),
            target: window.target.clone(),
            created: window.created,
            explicit_target: explicit_target && !req.relaunch,
            issue_id: req.issue_id,
            rows: req.rows.filter(|r| *r > 0).unwrap_or(self.config.rows),
            cols: req.cols.filter(|c| *c > 0).unwrap_or(self.config.cols),
            persistent: req.persistent.unwrap_or(self.config.persistent),
            env: req.env.into_iter().collect(),
        };
        let handle = self.launcher.launch(launch).await?;

        self.persist(&handle);
        if let Some(tool) = resolved.tool {
            if let Err(e) = self.tags.record(handle.target(), tool.as_str()) {
                tracing::warn!(target = %handle.target(), error = %e, "cannot record window tool");
            }
        }
        if let Some(prompt) = req.initial_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
            self.write_input(&id, &format!("{prompt}\n")).await;
        }

        tracing::info!(
            session_id = %id,
            owner = req.owner.id,
            workspace = req.workspace.id,
            target = %window.target,
            tool = ?resolved.tool,
            "session created"
        );
        Ok(CreatedSession {
            session_id: id,
            tmux_target: window.target,
            account: reported_account,
            existing: false,
            tool: resolved.tool,
        })
    }

    /// Pick the window for a create request.
    ///
    /// An explicit target that cannot be ensured falls back to the
    /// workspace window. An issue window already bound to a live session
    /// falls back to a scratch window.
    async fn resolve_window(
        &self,
        resolver: &WindowResolver<G>,
        req: &CreateSession,
        account: Option<&str>,
    ) -> Result<(EnsuredWindow, bool), BrokerError> {
        let explicit = req.tmux_target.as_deref().and_then(explicit_window);
        if let Some(window) = explicit {
            return match resolver.ensure(&req.owner, &req.workspace, Some(&window)).await {
                Ok(ensured) => Ok((ensured, true)),
                Err(e) if e.is_not_installed() => Err(e.into()),
                Err(e) => {
                    tracing::warn!(window = %window, error = %e, "explicit window unavailable, using workspace window");
                    Ok((resolver.ensure(&req.owner, &req.workspace, None).await?, false))
                }
            };
        }

        let scratch = || WindowKey::Scratch(self.ids.short_hex());
        let key = match req.issue_id {
            Some(issue) => WindowKey::Issue(issue),
            None => scratch(),
        };
        let name = window_name(&req.workspace, &key);
        let ensured = resolver.ensure(&req.owner, &req.workspace, Some(&name)).await?;
        if self.registry.find_by_target(account, &ensured.target).is_none() {
            return Ok((ensured, false));
        }
        let name = window_name(&req.workspace, &scratch());
        Ok((resolver.ensure(&req.owner, &req.workspace, Some(&name)).await?, false))
    }

    fn persist(&self, handle: &SessionHandle) {
        let record = NewRecord {
            session_id: handle.id().clone(),
            owner: handle.owner(),
            workspace: handle.workspace(),
            tool: handle.tool(),
            command: handle.command().to_string(),
            tmux_target: handle.target().clone(),
            account: handle.account().map(str::to_string),
            issue_id: handle.issue_id(),
            kind: handle.kind(),
        };
        match self.store.create(record) {
            Ok(record) => handle.set_record_id(record.id),
            Err(e) => tracing::warn!(session_id = %handle.id(), error = %e, "cannot persist session record"),
        }
    }

    /// Newest live session for an issue whose tmux window still exists.
    pub async fn find_for_issue(
        &self,
        owner: UserId,
        workspace: WorkspaceId,
        issue: u64,
        resolved: &ResolvedCommand,
    ) -> Option<Arc<SessionHandle>> {
        let filter = SessionFilter::owner(owner).with_workspace(workspace);
        let candidates: Vec<_> = self
            .registry
            .list(&filter)
            .into_iter()
            .rev()
            .filter(|h| h.issue_id() == Some(issue) && !h.is_terminated() && same_program(h, resolved))
            .collect();
        for handle in candidates {
            let gateway = self.gateway_for(handle.account());
            if let Ok(true) = gateway.has_window(handle.target()).await {
                return Some(handle);
            }
        }
        None
    }

    /// Forward input to a session. Unknown or ended sessions are ignored.
    pub async fn write_input(&self, id: &SessionId, text: &str) {
        self.ensure_recovered().await;
        let Some(handle) = self.registry.get(id) else {
            tracing::debug!(session_id = %id, "write to unknown session ignored");
            return;
        };
        if handle.is_terminated() {
            return;
        }
        match handle.kind() {
            SessionKind::Transient => {
                if let Err(e) = handle.write_pty(text.as_bytes()) {
                    tracing::debug!(session_id = %id, error = %e, "pty write failed");
                }
            }
            SessionKind::Persistent => {
                let gateway = self.gateway_for(handle.account());
                let mut lines = text.split('\n').peekable();
                while let Some(line) = lines.next() {
                    if !line.is_empty() {
                        if let Err(e) = gateway.send_literal(handle.target(), line).await {
                            tracing::warn!(session_id = %id, error = %e, "send-keys failed");
                            return;
                        }
                    }
                    if lines.peek().is_some() {
                        if let Err(e) = gateway.send_keys(handle.target(), "Enter", false).await {
                            tracing::warn!(session_id = %id, error = %e, "send-keys failed");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Resize a session's terminal. Zero dimensions are ignored.
    pub async fn resize(&self, id: &SessionId, rows: u16, cols: u16) {
        if rows == 0 || cols == 0 {
            return;
        }
        self.ensure_recovered().await;
        let Some(handle) = self.registry.get(id) else {
            return;
        };
        if handle.is_terminated() {
            return;
        }
        if let Some(pty) = handle.pty() {
            if let Err(e) = pty.resize(rows, cols) {
                tracing::debug!(session_id = %id, error = %e, "pty resize failed");
            }
        } else if let Err(e) = self
            .gateway_for(handle.account())
            .resize_window(handle.target(), rows, cols)
            .await
        {
            tracing::debug!(session_id = %id, error = %e, "resize-window failed");
        }
    }

    /// Attach to a session's output.
    pub async fn stream(&self, id: &SessionId) -> Result<FrameStream, BrokerError> {
        self.ensure_recovered().await;
        let handle = self
            .registry
            .get(id)
            .ok_or_else(|| BrokerError::session_not_found(id))?;
        FrameStream::attach(handle, self.config.keepalive)
    }

    /// Stop a session and mark its record ended. Closing twice is fine.
    ///
    /// The tmux window is left running.
    pub async fn close(&self, id: &SessionId) {
        self.ensure_recovered().await;
        let Some(handle) = self.registry.remove(id) else {
            return;
        };
        handle.terminate();

        if handle.kind() == SessionKind::Persistent {
            let target = handle.target().to_string();
            if let Err(e) = self
                .gateway_for(handle.account())
                .run(&["pipe-pane", "-t", &target])
                .await
            {
                tracing::debug!(session_id = %id, error = %e, "pipe-pane off failed");
            }
        }
        if let Some(record_id) = handle.record_id() {
            if let Err(e) = self.store.mark_ended(record_id) {
                tracing::warn!(session_id = %id, record_id, error = %e, "cannot mark record ended");
            }
        }
        tracing::info!(session_id = %id, target = %handle.target(), "session closed");
    }

    /// Live sessions matching `filter`.
    pub async fn list(&self, filter: &SessionFilter) -> Vec<SessionSummary> {
        self.ensure_recovered().await;
        self.registry
            .list(filter)
            .iter()
            .filter(|h| !h.is_terminated())
            .map(|h| h.summary())
            .collect()
    }

    /// The session, if `identity` may use it. Other users' sessions look
    /// exactly like missing ones.
    pub async fn authorize(
        &self,
        id: &SessionId,
        identity: &Identity,
    ) -> Result<Arc<SessionHandle>, BrokerError> {
        self.ensure_recovered().await;
        self.registry
            .get(id)
            .filter(|h| identity.can_access(h.owner()))
            .ok_or_else(|| BrokerError::session_not_found(id))
    }

    fn record_for(
        &self,
        identity: &Identity,
        record_id: u64,
    ) -> Result<SessionRecord, BrokerError> {
        self.store
            .get(record_id)?
            .filter(|r| identity.can_access(r.owner))
            .ok_or_else(|| BrokerError::record_not_found(record_id))
    }

    /// Check a record's window. A missing window ends an active record.
    pub async fn validate(
        &self,
        identity: &Identity,
        record_id: u64,
    ) -> Result<Validation, BrokerError> {
        self.ensure_recovered().await;
        let record = self.record_for(identity, record_id)?;
        let exists = self
            .gateway_for(record.account.as_deref())
            .has_window(&record.tmux_target)
            .await?;

        let mut marked_inactive = false;
        if exists {
            self.store.touch(record_id)?;
        } else if record.active {
            self.store.mark_ended(record_id)?;
            marked_inactive = true;
            tracing::info!(record_id, target = %record.tmux_target, "record marked inactive");
        }
        Ok(Validation {
            record_id,
            exists,
            marked_inactive,
        })
    }

    fn resume_line(record: &SessionRecord) -> String {
        record
            .tool
            .and_then(|tool| tool.resume_command(tool.as_str(), record.session_id.as_str()))
            .unwrap_or_else(|| record.command.clone())
    }

    /// Command that reopens a recorded session's conversation.
    pub async fn resume_command(
        &self,
        identity: &Identity,
        record_id: u64,
    ) -> Result<String, BrokerError> {
        self.ensure_recovered().await;
        Ok(Self::resume_line(&self.record_for(identity, record_id)?))
    }

    /// Start the resume command of a record on the record's window.
    pub async fn resume(
        &self,
        identity: &Identity,
        record_id: u64,
        owner: Owner,
        workspace: Workspace,
        rows: Option<u16>,
        cols: Option<u16>,
    ) -> Result<CreatedSession, BrokerError> {
        self.ensure_recovered().await;
        let record = self.record_for(identity, record_id)?;
        let mut req = CreateSession::new(owner, workspace)
            .command(Self::resume_line(&record))
            .target(record.tmux_target.to_string());
        req.tool = record.tool.map(|t| t.as_str().to_string());
        req.rows = rows;
        req.cols = cols;
        req.issue_id = record.issue_id;
        req.relaunch = true;
        self.create_session(req).await
    }

    /// Persisted sessions visible to `identity`, newest first.
    pub async fn history(
        &self,
        identity: &Identity,
        filter: SessionFilter,
    ) -> Result<Vec<HistoryEntry>, BrokerError> {
        self.ensure_recovered().await;
        let filter = if identity.is_admin {
            filter
        } else {
            SessionFilter {
                owner: Some(identity.user_id),
                ..filter
            }
        };
        let entries = self
            .store
            .list(&filter)?
            .into_iter()
            .map(|record| {
                let attach = self
                    .gateway_for(record.account.as_deref())
                    .attach_argv(&record.tmux_target);
                let live = self
                    .registry
                    .get(&record.session_id)
                    .is_some_and(|h| !h.is_terminated());
                HistoryEntry {
                    tool: record
                        .tool
                        .map(|t| t.as_str().to_string())
                        .or_else(|| self.tags.get(&record.tmux_target)),
                    attach_command: shell_words::join(attach),
                    resume_command: Self::resume_line(&record),
                    live,
                    record,
                }
            })
            .collect();
        Ok(entries)
    }

    /// Reconcile the owner's generated windows with `desired`.
    pub async fn sync_windows(
        &self,
        owner: &Owner,
        desired: &[Workspace],
    ) -> Result<SyncReport, BrokerError> {
        self.ensure_recovered().await;
        let account = self.config.accounts.resolve(owner);
        let resolver = WindowResolver::new(self.gateway_for(account.as_deref()), &self.config.instance_dir);
        let report = resolver.sync(owner, desired).await?;
        if let Err(e) = self.tags.remove(&report.removed) {
            tracing::warn!(error = %e, "cannot drop tags of removed windows");
        }
        tracing::info!(
            owner = owner.id,
            created = report.created.len(),
            removed = report.removed.len(),
            "synced windows"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
