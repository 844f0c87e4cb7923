// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identity and the summaries returned by list operations.

use crate::owner::UserId;
use crate::target::WindowTarget;
use crate::tool::Tool;
use crate::workspace::WorkspaceId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Opaque token naming one live broker session.
    pub struct SessionId;
}

/// How a session's output reaches the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Attach client in a pty owned by this process; lost on restart.
    Transient,
    /// Pane output teed to a pipe file; reattached after restart.
    Persistent,
}

/// Owner/workspace filter for list operations. Empty matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<WorkspaceId>,
}

impl SessionFilter {
    pub fn owner(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            workspace: None,
        }
    }

    pub fn with_workspace(mut self, workspace: WorkspaceId) -> Self {
        self.workspace = Some(workspace);
        self
    }

    pub fn matches(&self, owner: UserId, workspace: WorkspaceId) -> bool {
        self.owner.is_none_or(|o| o == owner) && self.workspace.is_none_or(|w| w == workspace)
    }
}

/// Point-in-time view of a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub started_at_ms: u64,
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
