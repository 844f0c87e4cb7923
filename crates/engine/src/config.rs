// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker configuration

use sb_core::{Owner, ToolCommands};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which OS account's tmux server hosts an owner's sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum AccountStrategy {
    /// Everything runs on the broker's own server.
    #[default]
    Service,
    /// Each owner's username is their OS account.
    Direct,
    /// Explicit username (or display name) → account table.
    Mapping { map: BTreeMap<String, String> },
}

impl AccountStrategy {
    /// Account for `owner`, or `None` for the broker's own server.
    pub fn resolve(&self, owner: &Owner) -> Option<String> {
        let non_blank = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match self {
            AccountStrategy::Service => None,
            AccountStrategy::Direct => non_blank(&owner.username),
            AccountStrategy::Mapping { map } => [&owner.username, &owner.display_name]
                .into_iter()
                .filter_map(non_blank)
                .find_map(|label| map.get(&label).cloned()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub tools: ToolCommands,
    pub rows: u16,
    pub cols: u16,
    /// Create pipe-backed sessions unless a request says otherwise.
    pub persistent: bool,
    /// Reattach pipe relays to surviving windows after a restart.
    pub reconnect_persistent: bool,
    pub keepalive: Duration,
    pub poll_interval: Duration,
    /// How often a pipe relay checks that its window still exists.
    pub liveness_interval: Duration,
    /// How long a pipe relay waits for tmux to create the pipe file.
    pub pipe_wait: Duration,
    pub queue_capacity: usize,
    /// Start directory of tmux sessions and fallback for workspaces.
    pub instance_dir: PathBuf,
    pub pipes_dir: PathBuf,
    pub accounts: AccountStrategy,
    /// Account the broker runs as, reported when no other account applies.
    pub service_account: Option<String>,
}

impl BrokerConfig {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            tools: ToolCommands::default(),
            rows: 30,
            cols: 100,
            persistent: false,
            reconnect_persistent: true,
            keepalive: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
            liveness_interval: Duration::from_secs(5),
            pipe_wait: Duration::from_secs(5),
            queue_capacity: 256,
            instance_dir: state_dir.join("instance"),
            pipes_dir: state_dir.join("pipes"),
            accounts: AccountStrategy::default(),
            service_account: None,
        }
    }

    pub(crate) fn pipe_file(&self, id: &sb_core::SessionId) -> PathBuf {
        self.pipes_dir.join(format!("{id}.log"))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
