// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live session registry

use crate::handle::SessionHandle;
use parking_lot::Mutex;
use sb_core::{SessionFilter, SessionId, WindowTarget};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("session {0} is already registered")]
    DuplicateId(SessionId),
    #[error("{target} is already bound to session {holder}")]
    TargetInUse {
        account: Option<String>,
        target: WindowTarget,
        holder: SessionId,
    },
}

/// Session id → live handle, one per broker.
#[derive(Default)]
pub struct Registry {
    sessions: Mutex<HashMap<SessionId, Arc<SessionHandle>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle unless its id or its tmux target is already taken.
    ///
    /// Targets are per tmux server, so the same `session:window` under two
    /// accounts are distinct. A target only counts as taken while its
    /// holder is not terminated.
    pub fn register(&self, handle: Arc<SessionHandle>) -> Result<(), RegisterError> {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(handle.id()) {
            return Err(RegisterError::DuplicateId(handle.id().clone()));
        }
        if let Some(holder) = sessions
            .values()
            .find(|h| binds(h, handle.account(), handle.target()))
        {
            return Err(RegisterError::TargetInUse {
                account: handle.account().map(str::to_string),
                target: handle.target().clone(),
                holder: holder.id().clone(),
            });
        }
        sessions.insert(handle.id().clone(), handle);
        Ok(())
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.lock().get(id).cloned()
    }

    /// Drop a handle. Removing an unknown id is not an error.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.lock().remove(id)
    }

    /// Handles matching `filter`, oldest first.
    pub fn list(&self, filter: &SessionFilter) -> Vec<Arc<SessionHandle>> {
        let mut handles: Vec<_> = self
            .sessions
            .lock()
            .values()
            .filter(|h| filter.matches(h.owner(), h.workspace()))
            .cloned()
            .collect();
        handles.sort_by_key(|h| h.started());
        handles
    }

    /// Live handle bound to `target` on `account`'s tmux server.
    pub fn find_by_target(
        &self,
        account: Option<&str>,
        target: &WindowTarget,
    ) -> Option<Arc<SessionHandle>> {
        self.sessions
            .lock()
            .values()
            .find(|h| binds(h, account, target))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

fn binds(handle: &SessionHandle, account: Option<&str>, target: &WindowTarget) -> bool {
    handle.account() == account && handle.target() == target && !handle.is_terminated()
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
