// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC Protocol for daemon communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.
//! Every request gets one response, except `Stream`, which is answered with
//! a `Frame` response per output frame until the close frame.

use sb_core::{Frame, Identity, Owner, SessionFilter, SessionId, SessionSummary, Workspace};
use sb_engine::{
    CreateSession, CreatedSession, HistoryEntry, RecoveryReport, SyncReport, Validation,
};
use serde::{Deserialize, Serialize};

#[path = "protocol_wire.rs"]
mod wire;
pub use wire::{
    decode, encode, encode_framed, read_message, read_request, read_response, write_message,
    write_request, write_response, ProtocolError, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE,
    PROTOCOL_VERSION,
};

/// Request from a client to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Start a session, or reuse the live one for the same issue
    Create {
        identity: Identity,
        request: CreateSession,
    },

    /// Send keystrokes to a session
    Write {
        identity: Identity,
        session_id: SessionId,
        input: String,
    },

    Resize {
        identity: Identity,
        session_id: SessionId,
        rows: u16,
        cols: u16,
    },

    /// Follow a session's output; the connection stays open
    Stream {
        identity: Identity,
        session_id: SessionId,
    },

    Close {
        identity: Identity,
        session_id: SessionId,
    },

    /// Live sessions. Non-admins only see their own.
    List {
        identity: Identity,
        #[serde(default)]
        filter: SessionFilter,
    },

    /// Check a persisted session against tmux
    Validate { identity: Identity, record_id: u64 },

    /// Command line that reopens a persisted session's conversation
    ResumeCommand { identity: Identity, record_id: u64 },

    /// Relaunch a persisted session on its window
    Resume {
        identity: Identity,
        record_id: u64,
        owner: Owner,
        workspace: Workspace,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cols: Option<u16>,
    },

    /// Persisted sessions, newest first
    History {
        identity: Identity,
        #[serde(default)]
        filter: SessionFilter,
    },

    /// Reconcile an owner's generated windows with their workspaces
    SyncWindows {
        identity: Identity,
        owner: Owner,
        workspaces: Vec<Workspace>,
    },

    /// Run recovery if needed and report what it found (admin only)
    Recover { identity: Identity },

    /// Request daemon shutdown
    Shutdown {
        /// Close every live session before stopping
        #[serde(default)]
        close_sessions: bool,
    },
}

/// Response from daemon to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Daemon is shutting down
    ShuttingDown,

    Created { session: CreatedSession },

    Sessions { sessions: Vec<SessionSummary> },

    /// One frame of a `Stream` request
    Frame { frame: Frame },

    Validation { validation: Validation },

    ResumeCommand { command: String },

    History { entries: Vec<HistoryEntry> },

    WindowsSynced { report: SyncReport },

    Recovered { report: RecoveryReport },

    /// Error response
    Error { kind: ErrorKind, message: String },
}

/// Coarse error class so clients can map failures without parsing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing, or owned by someone else
    NotFound,
    /// Caller may not act for the requested owner
    Forbidden,
    InvalidRequest,
    /// tmux is not installed
    Unavailable,
    /// Target window or stream already taken
    Conflict,
    Internal,
}

impl Response {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
