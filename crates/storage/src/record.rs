// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted session records

use chrono::{DateTime, Utc};
use sb_core::{SessionFilter, SessionId, SessionKind, Tool, UserId, WindowTarget, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Durable trace of one launched session.
///
/// Outlives the process that launched it; recovery and history read it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Store-assigned, starting at 1.
    pub id: u64,
    pub session_id: SessionId,
    pub owner: UserId,
    pub workspace: WorkspaceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<Tool>,
    pub command: String,
    pub tmux_target: WindowTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<u64>,
    pub kind: SessionKind,
    pub started_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl SessionRecord {
    pub fn matches(&self, filter: &SessionFilter) -> bool {
        filter.matches(self.owner, self.workspace)
    }
}

/// Fields supplied by the broker when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub session_id: SessionId,
    pub owner: UserId,
    pub workspace: WorkspaceId,
    pub tool: Option<Tool>,
    pub command: String,
    pub tmux_target: WindowTarget,
    pub account: Option<String>,
    pub issue_id: Option<u64>,
    pub kind: SessionKind,
}

impl NewRecord {
    pub(crate) fn into_record(self, id: u64, now: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            id,
            session_id: self.session_id,
            owner: self.owner,
            workspace: self.workspace,
            tool: self.tool,
            command: self.command,
            tmux_target: self.tmux_target,
            account: self.account,
            issue_id: self.issue_id,
            kind: self.kind,
            started_at: now,
            last_seen_at: now,
            ended_at: None,
            active: true,
        }
    }
}
