// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for live-session requests.

use sb_adapters::{PtyHost, TmuxGateway};
use sb_core::{Identity, SessionFilter, SessionId};
use sb_engine::{Broker, BrokerError, CreateSession};

use crate::protocol::Response;

use super::forbidden;

pub(super) async fn handle_create<G: TmuxGateway, P: PtyHost>(
    broker: &Broker<G, P>,
    identity: &Identity,
    request: CreateSession,
) -> Result<Response, BrokerError> {
    if !identity.can_access(request.owner.id) {
        return Ok(forbidden(request.owner.id));
    }
    let session = broker.create_session(request).await?;
    Ok(Response::Created { session })
}

pub(super) async fn handle_write<G: TmuxGateway, P: PtyHost>(
    broker: &Broker<G, P>,
    identity: &Identity,
    id: &SessionId,
    input: &str,
) -> Result<Response, BrokerError> {
    broker.authorize(id, identity).await?;
    broker.write_input(id, input).await;
    Ok(Response::Ok)
}

pub(super) async fn handle_resize<G: TmuxGateway, P: PtyHost>(
    broker: &Broker<G, P>,
    identity: &Identity,
    id: &SessionId,
    rows: u16,
    cols: u16,
) -> Result<Response, BrokerError> {
    broker.authorize(id, identity).await?;
    broker.resize(id, rows, cols).await;
    Ok(Response::Ok)
}

pub(super) async fn handle_close<G: TmuxGateway, P: PtyHost>(
    broker: &Broker<G, P>,
    identity: &Identity,
    id: &SessionId,
) -> Result<Response, BrokerError> {
    broker.authorize(id, identity).await?;
    broker.close(id).await;
    Ok(Response::Ok)
}

/// Live sessions; non-admins are limited to their own.
pub(super) async fn handle_list<G: TmuxGateway, P: PtyHost>(
    broker: &Broker<G, P>,
    identity: &Identity,
    filter: SessionFilter,
) -> Response {
    let filter = if identity.is_admin {
        filter
    } else {
        SessionFilter {
            owner: Some(identity.user_id),
            ..filter
        }
    };
    Response::Sessions {
        sessions: broker.list(&filter).await,
    }
}

/// Close every live session (shutdown with `close_sessions`).
pub(super) async fn close_all<G: TmuxGateway, P: PtyHost>(broker: &Broker<G, P>) {
    let sessions = broker.list(&SessionFilter::default()).await;
    for summary in &sessions {
        broker.close(&summary.id).await;
    }
    tracing::info!(count = sessions.len(), "closed all sessions before shutdown");
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
