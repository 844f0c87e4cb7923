// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace descriptor supplied by the caller.
//!
//! A workspace is the project a session works in: it names the tmux window
//! and provides the start directory for new windows and attach clients.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Numeric workspace id assigned by the caller.
pub type WorkspaceId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

impl Workspace {
    pub fn new(id: WorkspaceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            local_path: None,
            tenant: None,
        }
    }

    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Directory new windows and attach clients start in.
    ///
    /// Falls back to `instance_dir` when the workspace has no local path or
    /// the path cannot be created.
    pub fn start_dir(&self, instance_dir: &Path) -> PathBuf {
        if let Some(path) = self.local_path.as_deref() {
            if path.is_dir() || std::fs::create_dir_all(path).is_ok() {
                return path.to_path_buf();
            }
        }
        instance_dir.to_path_buf()
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
