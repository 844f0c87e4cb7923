// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for persisted sessions, windows and recovery.

use sb_adapters::{PtyHost, TmuxGateway};
use sb_core::{Identity, Owner, Workspace};
use sb_engine::{Broker, BrokerError};

use crate::protocol::{ErrorKind, Response};

use super::forbidden;

pub(super) async fn handle_resume<G: TmuxGateway, P: PtyHost>(
    broker: &Broker<G, P>,
    identity: &Identity,
    record_id: u64,
    owner: Owner,
    workspace: Workspace,
    rows: Option<u16>,
    cols: Option<u16>,
) -> Result<Response, BrokerError> {
    if !identity.can_access(owner.id) {
        return Ok(forbidden(owner.id));
    }
    let session = broker
        .resume(identity, record_id, owner, workspace, rows, cols)
        .await?;
    Ok(Response::Created { session })
}

pub(super) async fn handle_sync_windows<G: TmuxGateway, P: PtyHost>(
    broker: &Broker<G, P>,
    identity: &Identity,
    owner: &Owner,
    workspaces: &[Workspace],
) -> Result<Response, BrokerError> {
    if !identity.can_access(owner.id) {
        return Ok(forbidden(owner.id));
    }
    let report = broker.sync_windows(owner, workspaces).await?;
    Ok(Response::WindowsSynced { report })
}

pub(super) async fn handle_recover<G: TmuxGateway, P: PtyHost>(
    broker: &Broker<G, P>,
    identity: &Identity,
) -> Response {
    if !identity.is_admin {
        return Response::error(ErrorKind::Forbidden, "recovery report is admin only");
    }
    Response::Recovered {
        report: broker.recover().await,
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
