// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker on fake adapters for listener tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sb_adapters::{FakePtyHost, FakeTmux};
use sb_core::test_support::{alice, demo_workspace};
use sb_core::{Identity, SequentialIdGen, SessionId};
use sb_engine::{Broker, BrokerConfig, BrokerDeps, CreateSession};
use sb_storage::{MemoryRecordStore, RecordStore, WindowTags};
use tokio::sync::Notify;

use crate::protocol::{Request, Response};

pub(crate) type FakeBroker = Broker<FakeTmux, FakePtyHost>;

pub(crate) struct TestCtx {
    _dir: tempfile::TempDir,
    pub root: PathBuf,
    pub tmux: FakeTmux,
    pub store: Arc<MemoryRecordStore>,
    pub broker: Arc<FakeBroker>,
    pub shutdown: Arc<Notify>,
}

pub(crate) fn test_ctx() -> TestCtx {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let root = dir.path().to_path_buf();
    let tmux = FakeTmux::new();
    let store = Arc::new(MemoryRecordStore::new());
    let mut config = BrokerConfig::new(&root);
    config.keepalive = Duration::from_millis(50);
    config.poll_interval = Duration::from_millis(10);
    let broker = Broker::new(
        BrokerDeps {
            gateway: tmux.clone(),
            pty: FakePtyHost::new(),
            store: Arc::clone(&store) as Arc<dyn RecordStore>,
            tags: Arc::new(WindowTags::in_memory()),
            ids: Arc::new(SequentialIdGen::new("sess")),
        },
        config,
    );
    TestCtx {
        _dir: dir,
        root,
        tmux,
        store,
        broker: Arc::new(broker),
        shutdown: Arc::new(Notify::new()),
    }
}

impl TestCtx {
    pub fn workspace_root(&self) -> &Path {
        &self.root
    }

    /// A create request for alice in the demo workspace.
    pub fn create_request(&self) -> Request {
        let (owner, identity) = alice();
        Request::Create {
            identity,
            request: CreateSession::new(owner, demo_workspace(self.workspace_root())),
        }
    }

    pub async fn send(&self, request: Request) -> Response {
        super::handle_request(request, &self.broker, &self.shutdown).await
    }

    /// Create alice's session and return its id.
    pub async fn create_alice_session(&self) -> SessionId {
        match self.send(self.create_request()).await {
            Response::Created { session } => session.session_id,
            other => panic!("expected Created, got {other:?}"),
        }
    }

    pub async fn close_all(&self) {
        super::sessions::close_all(&self.broker).await;
    }
}

pub(crate) fn alice_identity() -> Identity {
    alice().1
}
