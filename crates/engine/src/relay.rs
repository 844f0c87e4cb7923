// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output relay: reader threads feeding per-session queues, and the
//! frame stream that drains them

use crate::error::BrokerError;
use crate::handle::SessionHandle;
use crate::registry::Registry;
use sb_adapters::TmuxGateway;
use sb_core::{Frame, SessionId};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};

const READ_BUF: usize = 4096;

/// What a reader thread pushes into a session's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RelayEvent {
    Data(Vec<u8>),
    /// The session ended; nothing follows.
    Closed,
}

/// Timing of a pipe-tail relay.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TailTiming {
    pub poll: Duration,
    pub liveness: Duration,
    pub wait: Duration,
}

fn thread_name(id: &SessionId) -> String {
    format!("relay-{}", id.short(8))
}

/// Queue a chunk without blocking the reader. Returns false once the
/// receiving side is gone for good.
fn push(handle: &SessionHandle, tx: &mpsc::Sender<RelayEvent>, bytes: &[u8]) -> bool {
    match tx.try_send(RelayEvent::Data(bytes.to_vec())) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::trace!(session_id = %handle.id(), len = bytes.len(), "queue full, dropping chunk");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Reader is done: stop the session, deregister it, tell the stream.
fn finish(handle: &SessionHandle, registry: &Registry, tx: mpsc::Sender<RelayEvent>) {
    handle.terminate();
    registry.remove(handle.id());
    let _ = tx.try_send(RelayEvent::Closed);
    drop(tx);
    tracing::info!(session_id = %handle.id(), target = %handle.target(), "session output ended");
}

/// Start the thread that pumps a pty master into the session queue.
pub(crate) fn spawn_pty_reader(
    handle: Arc<SessionHandle>,
    mut reader: Box<dyn Read + Send>,
    tx: mpsc::Sender<RelayEvent>,
    registry: Arc<Registry>,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name(thread_name(handle.id()))
        .spawn(move || {
            let mut buf = [0u8; READ_BUF];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if !push(&handle, &tx, &buf[..n]) {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::debug!(session_id = %handle.id(), error = %e, "pty read ended");
                        break;
                    }
                }
            }
            finish(&handle, &registry, tx);
        })
        .map(|_| ())
}

/// Start the thread that tails a session's pipe file.
///
/// Stops when the handle is terminated or the tmux window is gone.
pub(crate) fn spawn_pipe_tail<G: TmuxGateway>(
    handle: Arc<SessionHandle>,
    tx: mpsc::Sender<RelayEvent>,
    registry: Arc<Registry>,
    gateway: G,
    runtime: tokio::runtime::Handle,
    timing: TailTiming,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name(thread_name(handle.id()))
        .spawn(move || {
            if let Some(file) = wait_for_pipe(&handle, timing) {
                tail(&handle, &tx, file, &gateway, &runtime, timing);
            }
            finish(&handle, &registry, tx);
        })
        .map(|_| ())
}

fn wait_for_pipe(handle: &SessionHandle, timing: TailTiming) -> Option<File> {
    let path = handle.pipe_file()?;
    let deadline = Instant::now() + timing.wait;
    loop {
        if handle.is_terminated() {
            return None;
        }
        match File::open(path) {
            Ok(file) => return Some(file),
            Err(e) if Instant::now() >= deadline => {
                tracing::warn!(session_id = %handle.id(), path = %path.display(), error = %e, "pipe file never appeared");
                return None;
            }
            Err(_) => std::thread::sleep(timing.poll),
        }
    }
}

fn tail<G: TmuxGateway>(
    handle: &SessionHandle,
    tx: &mpsc::Sender<RelayEvent>,
    mut file: File,
    gateway: &G,
    runtime: &tokio::runtime::Handle,
    timing: TailTiming,
) {
    if let Err(e) = file.seek(SeekFrom::Start(handle.pipe_offset())) {
        tracing::warn!(session_id = %handle.id(), error = %e, "cannot seek pipe file");
        return;
    }
    let mut buf = [0u8; READ_BUF];
    let mut last_check = Instant::now();
    while !handle.is_terminated() {
        match file.read(&mut buf) {
            Ok(0) => {
                if last_check.elapsed() >= timing.liveness {
                    last_check = Instant::now();
                    // Treat an unreachable server as alive; only a confirmed
                    // missing window ends the tail.
                    if let Ok(false) = runtime.block_on(gateway.has_window(handle.target())) {
                        tracing::info!(session_id = %handle.id(), target = %handle.target(), "tmux window gone");
                        return;
                    }
                }
                std::thread::sleep(timing.poll);
            }
            Ok(n) => {
                handle.advance_pipe_offset(n as u64);
                if !push(handle, tx, &buf[..n]) {
                    return;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!(session_id = %handle.id(), error = %e, "pipe read failed");
                return;
            }
        }
    }
}

/// Frames of one session's output, with keepalives while idle.
///
/// Only one stream per session may be attached at a time; dropping the
/// stream releases the session's queue for the next one.
pub struct FrameStream {
    handle: Arc<SessionHandle>,
    rx: Option<mpsc::Receiver<RelayEvent>>,
    keepalive: Duration,
    finished: bool,
}

impl std::fmt::Debug for FrameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream")
            .field("session_id", self.handle.id())
            .field("keepalive", &self.keepalive)
            .field("finished", &self.finished)
            .finish()
    }
}

impl FrameStream {
    pub(crate) fn attach(
        handle: Arc<SessionHandle>,
        keepalive: Duration,
    ) -> Result<Self, BrokerError> {
        let rx = handle
            .take_output()
            .ok_or_else(|| BrokerError::StreamBusy(handle.id().clone()))?;
        Ok(Self {
            handle,
            rx: Some(rx),
            keepalive,
            finished: false,
        })
    }

    pub fn session_id(&self) -> &SessionId {
        self.handle.id()
    }

    /// Next frame, or `None` once a close frame has been returned.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        if self.finished {
            return None;
        }
        let rx = self.rx.as_mut()?;
        match tokio::time::timeout(self.keepalive, rx.recv()).await {
            Ok(Some(RelayEvent::Data(bytes))) => Some(Frame::Chunk(bytes)),
            Ok(Some(RelayEvent::Closed)) | Ok(None) => {
                self.finished = true;
                Some(Frame::Close)
            }
            Err(_) if self.handle.is_terminated() => {
                self.finished = true;
                Some(Frame::Close)
            }
            Err(_) => Some(Frame::Keepalive),
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        if let Some(rx) = self.rx.take() {
            self.handle.return_output(rx);
        }
    }
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
