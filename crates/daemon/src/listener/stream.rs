// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream requests: one `Frame` response per frame until close.

use sb_adapters::{PtyHost, TmuxGateway};
use sb_core::{Identity, SessionId};
use sb_engine::Broker;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::protocol::{self, Response, DEFAULT_TIMEOUT};

use super::{error_response, ConnectionError};

/// Relay a session's frames to `writer`.
///
/// Ends after the close frame, or quietly when the client stops reading.
/// Dropping the stream releases the session for the next client.
pub(super) async fn serve<G, P, W>(
    broker: &Broker<G, P>,
    identity: &Identity,
    id: &SessionId,
    writer: &mut W,
) -> Result<(), ConnectionError>
where
    G: TmuxGateway,
    P: PtyHost,
    W: AsyncWriteExt + Unpin,
{
    let attached = match broker.authorize(id, identity).await {
        Ok(_) => broker.stream(id).await,
        Err(e) => Err(e),
    };
    let mut stream = match attached {
        Ok(stream) => stream,
        Err(e) => {
            protocol::write_response(writer, &error_response(&e), DEFAULT_TIMEOUT).await?;
            return Ok(());
        }
    };

    debug!(session_id = %id, "stream attached");
    let mut frames = 0u64;
    while let Some(frame) = stream.next_frame().await {
        let last = frame.is_close();
        let response = Response::Frame { frame };
        if let Err(e) = protocol::write_response(writer, &response, DEFAULT_TIMEOUT).await {
            debug!(session_id = %id, error = %e, "stream client went away");
            return Ok(());
        }
        frames += 1;
        if last {
            break;
        }
    }
    debug!(session_id = %id, frames, "stream finished");
    Ok(())
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
