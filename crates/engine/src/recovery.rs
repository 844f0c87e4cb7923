// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reattach to sessions that survived a broker restart

use crate::config::BrokerConfig;
use crate::handle::SessionMeta;
use crate::launcher::Launcher;
use crate::registry::Registry;
use sb_adapters::{PtyHost, TmuxGateway};
use sb_core::{SessionId, SessionKind, WindowTarget};
use sb_storage::{RecordStore, SessionRecord, WindowTags};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Outcome of one recovery scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    /// Sessions whose window is alive and now have a relay again.
    pub reconnected: Vec<SessionId>,
    /// Active records with no live window. Left as they are.
    pub unmatched: Vec<SessionId>,
    /// Already registered, transient (its attach pty died with the old
    /// broker), reconnection disabled, or reattach failed.
    pub skipped: Vec<SessionId>,
}

impl RecoveryReport {
    pub fn is_empty(&self) -> bool {
        self.reconnected.is_empty() && self.unmatched.is_empty() && self.skipped.is_empty()
    }
}

fn meta(record: &SessionRecord) -> SessionMeta {
    SessionMeta {
        id: record.session_id.clone(),
        owner: record.owner,
        workspace: record.workspace,
        tool: record.tool,
        command: record.command.clone(),
        account: record.account.clone(),
        target: record.tmux_target.clone(),
        issue_id: record.issue_id,
    }
}

/// Every live window, keyed by the account whose server hosts it, and
/// whether every server could be listed.
async fn live_windows<G: TmuxGateway>(
    gateway: &G,
    records: &[SessionRecord],
) -> (HashSet<(Option<String>, WindowTarget)>, bool) {
    let accounts: BTreeSet<Option<String>> = std::iter::once(None)
        .chain(records.iter().map(|r| r.account.clone()))
        .collect();

    let mut live = HashSet::new();
    let mut complete = true;
    for account in accounts {
        match gateway.for_account(account.as_deref()).list_all_windows().await {
            Ok(windows) => live.extend(windows.into_iter().map(|w| (account.clone(), w))),
            Err(e) => {
                complete = false;
                tracing::warn!(account = ?account, error = %e, "cannot list tmux windows for recovery")
            }
        }
    }
    (live, complete)
}

/// Match active persistent records against live tmux windows and reattach
/// pipe relays.
///
/// Never creates or kills windows and never changes a record's active flag.
/// Tool tags of windows that no longer exist anywhere are dropped.
pub(crate) async fn scan<G: TmuxGateway, P: PtyHost>(
    gateway: &G,
    store: &dyn RecordStore,
    tags: &WindowTags,
    registry: &Registry,
    launcher: &Launcher<G, P>,
    config: &BrokerConfig,
) -> RecoveryReport {
    let records = match store.active() {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(error = %e, "cannot load session records for recovery");
            return RecoveryReport::default();
        }
    };
    let mut report = RecoveryReport::default();

    let (live, complete) = live_windows(gateway, &records).await;
    if complete {
        if let Err(e) = tags.prune(live.iter().map(|(_, target)| target)) {
            tracing::warn!(error = %e, "cannot prune window tags");
        }
    }
    for record in records {
        let id = record.session_id.clone();
        if registry.get(&id).is_some() {
            report.skipped.push(id);
            continue;
        }
        if !live.contains(&(record.account.clone(), record.tmux_target.clone())) {
            tracing::debug!(session_id = %id, target = %record.tmux_target, "no live window for record");
            report.unmatched.push(id);
            continue;
        }
        if record.kind == SessionKind::Transient {
            tracing::debug!(session_id = %id, target = %record.tmux_target, "transient session not recoverable");
            report.skipped.push(id);
            continue;
        }
        if !config.reconnect_persistent {
            report.skipped.push(id);
            continue;
        }
        let gateway = gateway.for_account(record.account.as_deref());
        match launcher.attach_pipe(meta(&record), gateway) {
            Ok(handle) => {
                handle.set_record_id(record.id);
                tracing::info!(session_id = %id, target = %record.tmux_target, "reconnected session");
                report.reconnected.push(id);
            }
            Err(e) => {
                tracing::warn!(session_id = %id, target = %record.tmux_target, error = %e, "cannot reattach session");
                report.skipped.push(id);
            }
        }
    }

    tracing::info!(
        reconnected = report.reconnected.len(),
        unmatched = report.unmatched.len(),
        skipped = report.skipped.len(),
        "recovery scan complete"
    );
    report
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
