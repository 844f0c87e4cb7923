// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and handing
//! each one to its own task. Every connection carries one request; a
//! `Stream` request keeps its connection for the life of the stream.

mod records;
mod sessions;
mod stream;

#[cfg(test)]
mod test_helpers;

use std::sync::Arc;

use sb_adapters::{PtyHost, TmuxGateway};
use sb_engine::{Broker, BrokerError};
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::protocol::{self, ErrorKind, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Listener task for accepting socket connections.
pub struct Listener<G, P> {
    socket: UnixListener,
    broker: Arc<Broker<G, P>>,
    shutdown: Arc<Notify>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl<G: TmuxGateway, P: PtyHost> Listener<G, P> {
    pub fn new(socket: UnixListener, broker: Arc<Broker<G, P>>, shutdown: Arc<Notify>) -> Self {
        Self {
            socket,
            broker,
            shutdown,
        }
    }

    /// Run the listener loop, spawning a task for each connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let broker = Arc::clone(&self.broker);
                    let shutdown = Arc::clone(&self.shutdown);

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, broker, shutdown).await {
                            match e {
                                ConnectionError::Protocol(
                                    protocol::ProtocolError::ConnectionClosed,
                                ) => debug!("Client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("Connection timeout")
                                }
                                _ => error!("Connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection<G: TmuxGateway, P: PtyHost>(
    stream: UnixStream,
    broker: Arc<Broker<G, P>>,
    shutdown: Arc<Notify>,
) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;

    // Polling requests at debug, everything else at info
    if matches!(request, Request::Ping | Request::List { .. }) {
        debug!(request = ?request, "received request");
    } else {
        info!(request = ?request, "received request");
    }

    if let Request::Stream {
        identity,
        session_id,
    } = request
    {
        return stream::serve(&broker, &identity, &session_id, &mut writer).await;
    }

    let response = handle_request(request, &broker, &shutdown).await;
    debug!("Sending response: {:?}", response);
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;

    Ok(())
}

/// Handle a single request and return a response.
pub(crate) async fn handle_request<G: TmuxGateway, P: PtyHost>(
    request: Request,
    broker: &Broker<G, P>,
    shutdown: &Notify,
) -> Response {
    let result = match request {
        Request::Ping => Ok(Response::Pong),

        Request::Hello { version: _ } => Ok(Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        }),

        Request::Create { identity, request } => {
            sessions::handle_create(broker, &identity, request).await
        }

        Request::Write {
            identity,
            session_id,
            input,
        } => sessions::handle_write(broker, &identity, &session_id, &input).await,

        Request::Resize {
            identity,
            session_id,
            rows,
            cols,
        } => sessions::handle_resize(broker, &identity, &session_id, rows, cols).await,

        Request::Close {
            identity,
            session_id,
        } => sessions::handle_close(broker, &identity, &session_id).await,

        Request::List { identity, filter } => {
            Ok(sessions::handle_list(broker, &identity, filter).await)
        }

        // Served on the connection itself
        Request::Stream { .. } => Ok(Response::error(
            ErrorKind::InvalidRequest,
            "stream requests need their own connection",
        )),

        Request::Validate {
            identity,
            record_id,
        } => broker
            .validate(&identity, record_id)
            .await
            .map(|validation| Response::Validation { validation }),

        Request::ResumeCommand {
            identity,
            record_id,
        } => broker
            .resume_command(&identity, record_id)
            .await
            .map(|command| Response::ResumeCommand { command }),

        Request::Resume {
            identity,
            record_id,
            owner,
            workspace,
            rows,
            cols,
        } => {
            records::handle_resume(broker, &identity, record_id, owner, workspace, rows, cols)
                .await
        }

        Request::History { identity, filter } => broker
            .history(&identity, filter)
            .await
            .map(|entries| Response::History { entries }),

        Request::SyncWindows {
            identity,
            owner,
            workspaces,
        } => records::handle_sync_windows(broker, &identity, &owner, &workspaces).await,

        Request::Recover { identity } => Ok(records::handle_recover(broker, &identity).await),

        Request::Shutdown { close_sessions } => {
            if close_sessions {
                sessions::close_all(broker).await;
            }
            shutdown.notify_one();
            Ok(Response::ShuttingDown)
        }
    };

    result.unwrap_or_else(|e| error_response(&e))
}

/// Client-facing form of a broker error.
pub(crate) fn error_response(e: &BrokerError) -> Response {
    let kind = match e {
        BrokerError::Tool(_) | BrokerError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        BrokerError::TmuxMissing(_) => ErrorKind::Unavailable,
        BrokerError::NotFound(_) => ErrorKind::NotFound,
        BrokerError::TargetInUse(_) | BrokerError::StreamBusy(_) => ErrorKind::Conflict,
        BrokerError::Gateway(_)
        | BrokerError::NoPane(_)
        | BrokerError::Pty(_)
        | BrokerError::Store(_)
        | BrokerError::Io(_) => ErrorKind::Internal,
    };
    if kind == ErrorKind::Internal {
        warn!(error = %e, "request failed");
    }
    Response::error(kind, e.to_string())
}

/// Refusal for acting on another user's behalf.
pub(crate) fn forbidden(owner: u64) -> Response {
    Response::error(
        ErrorKind::Forbidden,
        format!("not allowed to act for user {owner}"),
    )
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
