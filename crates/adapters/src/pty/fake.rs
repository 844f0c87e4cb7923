// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pty host that runs a stand-in command for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{NativePtyHost, PtyError, PtyHost, PtyProcess, PtySpec};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every spec and runs `stand_in` on a real pty instead of its argv.
///
/// Tests get a live pty (resize, EOF, termination) without needing the
/// requested program, typically a tmux client.
#[derive(Clone)]
pub struct FakePtyHost {
    stand_in: Vec<String>,
    spawned: Arc<Mutex<Vec<PtySpec>>>,
    fail: Arc<Mutex<bool>>,
}

impl Default for FakePtyHost {
    fn default() -> Self {
        Self::with_stand_in(["cat"])
    }
}

impl FakePtyHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stand_in<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stand_in: argv.into_iter().map(Into::into).collect(),
            spawned: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(Mutex::new(false)),
        }
    }

    /// Specs passed to `spawn`, in order.
    pub fn spawned(&self) -> Vec<PtySpec> {
        self.spawned.lock().clone()
    }

    /// Make subsequent spawns fail.
    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

impl PtyHost for FakePtyHost {
    fn spawn(&self, spec: &PtySpec) -> Result<PtyProcess, PtyError> {
        self.spawned.lock().push(spec.clone());
        if *self.fail.lock() {
            return Err(PtyError::Spawn {
                program: spec.argv.first().cloned().unwrap_or_default(),
                message: "injected failure".to_string(),
            });
        }
        let stand_in = PtySpec {
            argv: self.stand_in.clone(),
            ..spec.clone()
        };
        NativePtyHost.spawn(&stand_in)
    }
}
