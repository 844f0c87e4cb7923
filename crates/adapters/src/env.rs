// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

use crate::subprocess::TMUX_TIMEOUT;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// tmux binary to invoke (default: `tmux` on PATH).
pub fn tmux_binary() -> String {
    std::env::var("SB_TMUX_BIN")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "tmux".to_string())
}

/// Per-command tmux timeout (default: 10s).
pub fn tmux_timeout() -> Duration {
    parse_duration_ms("SB_TMUX_TIMEOUT_MS").unwrap_or(TMUX_TIMEOUT)
}
