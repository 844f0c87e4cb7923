// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output stream frames.
//!
//! Frames carry raw terminal bytes to a client. On the wire they render as
//! server-sent events (`event: chunk`) or as JSON objects with the same
//! `event`/`data` fields; chunk payloads are base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const KEEPALIVE_DATA: &str = "ping";
pub const CLOSE_DATA: &str = "session-closed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Bytes read from the session, in source order.
    Chunk(Vec<u8>),
    /// Nothing arrived within the keepalive interval.
    Keepalive,
    /// The session ended; no more frames follow.
    Close,
}

impl Frame {
    pub fn event(&self) -> &'static str {
        match self {
            Frame::Chunk(_) => "chunk",
            Frame::Keepalive => "keepalive",
            Frame::Close => "close",
        }
    }

    pub fn data(&self) -> String {
        match self {
            Frame::Chunk(bytes) => STANDARD.encode(bytes),
            Frame::Keepalive => KEEPALIVE_DATA.to_string(),
            Frame::Close => CLOSE_DATA.to_string(),
        }
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Frame::Close)
    }

    /// Server-sent event text for this frame.
    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event(), self.data())
    }
}

#[derive(Serialize, Deserialize)]
struct WireFrame {
    event: String,
    data: String,
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireFrame {
            event: self.event().to_string(),
            data: self.data(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Frame {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireFrame::deserialize(deserializer)?;
        match wire.event.as_str() {
            "chunk" => STANDARD
                .decode(wire.data.as_bytes())
                .map(Frame::Chunk)
                .map_err(D::Error::custom),
            "keepalive" => Ok(Frame::Keepalive),
            "close" => Ok(Frame::Close),
            other => Err(D::Error::unknown_variant(
                other,
                &["chunk", "keepalive", "close"],
            )),
        }
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
