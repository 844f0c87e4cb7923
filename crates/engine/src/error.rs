// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the broker

use sb_adapters::{GatewayError, PtyError};
use sb_core::{SessionId, ToolError, WindowTarget};
use sb_storage::StoreError;
use thiserror::Error;

/// Errors surfaced by broker operations
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("tmux binary not found ({0}); install tmux or disable tmux integration")]
    TmuxMissing(String),
    #[error("tmux error: {0}")]
    Gateway(GatewayError),
    #[error("unable to access a tmux pane in {0}")]
    NoPane(WindowTarget),
    #[error("pty error: {0}")]
    Pty(#[from] PtyError),
    #[error("tmux window {0} is already bound to a live session")]
    TargetInUse(WindowTarget),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("session {0} already has a stream attached")]
    StreamBusy(SessionId),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GatewayError> for BrokerError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::NotInstalled(binary) => BrokerError::TmuxMissing(binary),
            other => BrokerError::Gateway(other),
        }
    }
}

impl BrokerError {
    pub(crate) fn session_not_found(id: &SessionId) -> Self {
        BrokerError::NotFound(format!("session {id}"))
    }

    pub(crate) fn record_not_found(id: u64) -> Self {
        BrokerError::NotFound(format!("session record {id}"))
    }
}
