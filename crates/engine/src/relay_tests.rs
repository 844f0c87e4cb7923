// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::handle::{Backing, SessionMeta};
use sb_adapters::{FakePtyHost, FakeTmux, PtyHost, PtySpec};
use std::io::Write;
use std::path::PathBuf;

const KEEPALIVE: Duration = Duration::from_millis(50);

fn meta(id: &str, target: &str) -> SessionMeta {
    SessionMeta {
        id: SessionId::new(id),
        owner: 1,
        workspace: 7,
        tool: None,
        command: "bash".to_string(),
        account: None,
        target: target.parse().unwrap(),
        issue_id: None,
    }
}

fn queued(id: &str) -> (Arc<SessionHandle>, mpsc::Sender<RelayEvent>) {
    let backing = Backing::persistent(PathBuf::from("/nonexistent"), 0);
    SessionHandle::new(meta(id, "alice:demo-p7"), backing, 8)
}

/// Collect frames until close or `limit` frames.
async fn frames(stream: &mut FrameStream, limit: usize) -> Vec<Frame> {
    let mut out = Vec::new();
    while let Some(frame) = stream.next_frame().await {
        out.push(frame);
        if out.len() >= limit {
            break;
        }
    }
    out
}

#[tokio::test]
async fn idle_stream_sends_keepalives() {
    let (handle, _tx) = queued("s1");
    let mut stream = FrameStream::attach(handle, KEEPALIVE).unwrap();
    assert_eq!(stream.next_frame().await, Some(Frame::Keepalive));
    assert_eq!(stream.next_frame().await, Some(Frame::Keepalive));
}

#[tokio::test]
async fn chunks_then_close_then_end() {
    let (handle, tx) = queued("s1");
    tx.try_send(RelayEvent::Data(b"one".to_vec())).unwrap();
    tx.try_send(RelayEvent::Data(b"two".to_vec())).unwrap();
    tx.try_send(RelayEvent::Closed).unwrap();

    let mut stream = FrameStream::attach(handle, KEEPALIVE).unwrap();
    assert_eq!(
        frames(&mut stream, 10).await,
        vec![
            Frame::Chunk(b"one".to_vec()),
            Frame::Chunk(b"two".to_vec()),
            Frame::Close
        ]
    );
    assert_eq!(stream.next_frame().await, None);
}

#[tokio::test]
async fn dropped_sender_closes_stream() {
    let (handle, tx) = queued("s1");
    drop(tx);
    let mut stream = FrameStream::attach(handle, KEEPALIVE).unwrap();
    assert_eq!(stream.next_frame().await, Some(Frame::Close));
    assert_eq!(stream.next_frame().await, None);
}

#[tokio::test]
async fn terminated_idle_session_closes_instead_of_keepalive() {
    let (handle, _tx) = queued("s1");
    handle.mark_terminated();
    let mut stream = FrameStream::attach(handle, KEEPALIVE).unwrap();
    assert_eq!(stream.next_frame().await, Some(Frame::Close));
}

#[tokio::test]
async fn second_stream_is_refused_until_first_drops() {
    let (handle, _tx) = queued("s1");
    let first = FrameStream::attach(Arc::clone(&handle), KEEPALIVE).unwrap();
    assert_eq!(first.session_id(), "s1");
    let err = FrameStream::attach(Arc::clone(&handle), KEEPALIVE).unwrap_err();
    assert!(matches!(err, BrokerError::StreamBusy(ref id) if id == "s1"));

    drop(first);
    let third = FrameStream::attach(handle, KEEPALIVE).unwrap();
    assert!(format!("{third:?}").contains("s1"));
}

#[tokio::test]
async fn pty_reader_relays_output_and_deregisters_on_exit() {
    let host = FakePtyHost::with_stand_in(["sh", "-c", "printf relay-out"]);
    let process = host.spawn(&PtySpec::new(vec!["tmux".to_string()])).unwrap();
    let reader = process.take_reader().unwrap();
    let writer = process.take_writer().unwrap();
    let (handle, tx) = SessionHandle::new(
        meta("s1", "alice:demo-p7"),
        Backing::transient(process, writer),
        8,
    );
    let registry = Arc::new(Registry::new());
    registry.register(Arc::clone(&handle)).unwrap();

    spawn_pty_reader(Arc::clone(&handle), reader, tx, Arc::clone(&registry)).unwrap();
    let mut stream = FrameStream::attach(Arc::clone(&handle), Duration::from_secs(5)).unwrap();

    let mut output = Vec::new();
    let mut closed = false;
    while let Some(frame) = stream.next_frame().await {
        match frame {
            Frame::Chunk(bytes) => output.extend(bytes),
            Frame::Close => closed = true,
            Frame::Keepalive => {}
        }
    }
    assert!(String::from_utf8_lossy(&output).contains("relay-out"));
    assert!(closed);
    assert!(handle.is_terminated());
    assert!(registry.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn pipe_tail_relays_appended_bytes_from_offset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s1.log");
    std::fs::write(&path, b"old-output").unwrap();

    let tmux = FakeTmux::new();
    tmux.add_window("alice:demo-p7");
    let (handle, tx) = SessionHandle::new(
        meta("s1", "alice:demo-p7"),
        Backing::persistent(path.clone(), 10),
        8,
    );
    let registry = Arc::new(Registry::new());
    registry.register(Arc::clone(&handle)).unwrap();
    let timing = TailTiming {
        poll: Duration::from_millis(10),
        liveness: Duration::from_millis(50),
        wait: Duration::from_secs(1),
    };
    spawn_pipe_tail(
        Arc::clone(&handle),
        tx,
        Arc::clone(&registry),
        tmux.clone(),
        tokio::runtime::Handle::current(),
        timing,
    )
    .unwrap();

    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"new-output").unwrap();
    file.flush().unwrap();

    let mut stream = FrameStream::attach(Arc::clone(&handle), Duration::from_secs(2)).unwrap();
    let frame = stream.next_frame().await.unwrap();
    assert_eq!(frame, Frame::Chunk(b"new-output".to_vec()));
    assert_eq!(handle.pipe_offset(), 20);

    // Window disappears: tail ends and the session is dropped
    tmux.remove_window("alice:demo-p7");
    let mut rest = Vec::new();
    while let Some(frame) = stream.next_frame().await {
        rest.push(frame);
    }
    assert_eq!(rest.last(), Some(&Frame::Close));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn pipe_tail_gives_up_when_file_never_appears() {
    let (handle, tx) = SessionHandle::new(
        meta("s1", "alice:demo-p7"),
        Backing::persistent(PathBuf::from("/nonexistent/s1.log"), 0),
        8,
    );
    let registry = Arc::new(Registry::new());
    registry.register(Arc::clone(&handle)).unwrap();
    let timing = TailTiming {
        poll: Duration::from_millis(10),
        liveness: Duration::from_secs(5),
        wait: Duration::from_millis(50),
    };
    spawn_pipe_tail(
        Arc::clone(&handle),
        tx,
        Arc::clone(&registry),
        FakeTmux::new(),
        tokio::runtime::Handle::current(),
        timing,
    )
    .unwrap();

    let mut stream = FrameStream::attach(Arc::clone(&handle), Duration::from_secs(2)).unwrap();
    assert_eq!(stream.next_frame().await, Some(Frame::Close));
    assert!(handle.is_terminated());
}
