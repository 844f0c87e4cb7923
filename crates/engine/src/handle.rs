// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory state of one live session

use crate::relay::RelayEvent;
use parking_lot::Mutex;
use sb_adapters::PtyProcess;
use sb_core::{SessionId, SessionKind, SessionSummary, Tool, UserId, WindowTarget, WorkspaceId};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

/// Identity of a session, fixed at launch.
#[derive(Debug, Clone)]
pub(crate) struct SessionMeta {
    pub id: SessionId,
    pub owner: UserId,
    pub workspace: WorkspaceId,
    pub tool: Option<Tool>,
    pub command: String,
    pub account: Option<String>,
    pub target: WindowTarget,
    pub issue_id: Option<u64>,
}

/// Where output comes from and where input goes.
pub(crate) enum Backing {
    /// Attach client in a pty owned by this process.
    Transient {
        process: PtyProcess,
        writer: Mutex<Option<Box<dyn Write + Send>>>,
    },
    /// Pane output teed into a file by `pipe-pane`.
    Persistent { pipe_file: PathBuf, offset: AtomicU64 },
}

impl Backing {
    pub(crate) fn transient(process: PtyProcess, writer: Box<dyn Write + Send>) -> Self {
        Backing::Transient {
            process,
            writer: Mutex::new(Some(writer)),
        }
    }

    pub(crate) fn persistent(pipe_file: PathBuf, offset: u64) -> Self {
        Backing::Persistent {
            pipe_file,
            offset: AtomicU64::new(offset),
        }
    }
}

pub struct SessionHandle {
    meta: SessionMeta,
    backing: Backing,
    started: Instant,
    started_at_ms: u64,
    record_id: OnceLock<u64>,
    terminated: AtomicBool,
    /// Taken by the attached stream, returned when it is dropped.
    output: Mutex<Option<mpsc::Receiver<RelayEvent>>>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.meta.id)
            .field("target", &self.meta.target)
            .field("kind", &self.kind())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

impl SessionHandle {
    /// New handle plus the sending half of its output queue.
    pub(crate) fn new(
        meta: SessionMeta,
        backing: Backing,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Sender<RelayEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let started_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let handle = Arc::new(Self {
            meta,
            backing,
            started: Instant::now(),
            started_at_ms,
            record_id: OnceLock::new(),
            terminated: AtomicBool::new(false),
            output: Mutex::new(Some(rx)),
        });
        (handle, tx)
    }

    pub fn id(&self) -> &SessionId {
        &self.meta.id
    }

    pub fn owner(&self) -> UserId {
        self.meta.owner
    }

    pub fn workspace(&self) -> WorkspaceId {
        self.meta.workspace
    }

    pub fn tool(&self) -> Option<Tool> {
        self.meta.tool
    }

    pub fn command(&self) -> &str {
        &self.meta.command
    }

    pub fn account(&self) -> Option<&str> {
        self.meta.account.as_deref()
    }

    pub fn target(&self) -> &WindowTarget {
        &self.meta.target
    }

    pub fn issue_id(&self) -> Option<u64> {
        self.meta.issue_id
    }

    pub fn record_id(&self) -> Option<u64> {
        self.record_id.get().copied()
    }

    pub(crate) fn set_record_id(&self, id: u64) {
        let _ = self.record_id.set(id);
    }

    pub(crate) fn started(&self) -> Instant {
        self.started
    }

    pub fn kind(&self) -> SessionKind {
        match self.backing {
            Backing::Transient { .. } => SessionKind::Transient,
            Backing::Persistent { .. } => SessionKind::Persistent,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pty().and_then(PtyProcess::pid)
    }

    pub(crate) fn pty(&self) -> Option<&PtyProcess> {
        match &self.backing {
            Backing::Transient { process, .. } => Some(process),
            Backing::Persistent { .. } => None,
        }
    }

    pub(crate) fn pipe_file(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Persistent { pipe_file, .. } => Some(pipe_file),
            Backing::Transient { .. } => None,
        }
    }

    /// Byte offset the pipe relay has consumed up to.
    pub(crate) fn pipe_offset(&self) -> u64 {
        match &self.backing {
            Backing::Persistent { offset, .. } => offset.load(Ordering::SeqCst),
            Backing::Transient { .. } => 0,
        }
    }

    pub(crate) fn advance_pipe_offset(&self, n: u64) {
        if let Backing::Persistent { offset, .. } = &self.backing {
            offset.fetch_add(n, Ordering::SeqCst);
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Set the termination flag. Returns true only for the call that set it.
    pub(crate) fn mark_terminated(&self) -> bool {
        !self.terminated.swap(true, Ordering::SeqCst)
    }

    /// Write raw input to the pty. Only meaningful for transient sessions.
    pub(crate) fn write_pty(&self, data: &[u8]) -> std::io::Result<()> {
        let Backing::Transient { writer, .. } = &self.backing else {
            return Ok(());
        };
        let mut writer = writer.lock();
        match writer.as_mut() {
            Some(w) => {
                w.write_all(data)?;
                w.flush()
            }
            None => Ok(()),
        }
    }

    /// Mark terminated and stop (and reap) the attach client, if any.
    ///
    /// Best-effort and idempotent.
    pub(crate) fn terminate(&self) {
        self.mark_terminated();
        if let Backing::Transient { process, writer } = &self.backing {
            writer.lock().take();
            process.terminate();
        }
    }

    pub(crate) fn take_output(&self) -> Option<mpsc::Receiver<RelayEvent>> {
        self.output.lock().take()
    }

    pub(crate) fn return_output(&self, rx: mpsc::Receiver<RelayEvent>) {
        *self.output.lock() = Some(rx);
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.meta.id.clone(),
            owner: self.meta.owner,
            workspace: self.meta.workspace,
            tool: self.meta.tool,
            command: self.meta.command.clone(),
            tmux_target: self.meta.target.clone(),
            account: self.meta.account.clone(),
            issue_id: self.meta.issue_id,
            kind: self.kind(),
            pid: self.pid(),
            started_at_ms: self.started_at_ms,
        }
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
