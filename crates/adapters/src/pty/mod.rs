// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pseudo-terminal hosting for attach clients

mod native;

pub use native::NativePtyHost;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePtyHost;

use parking_lot::Mutex;
use portable_pty::{Child, MasterPty, PtySize};
use std::io::{Read, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from pty operations
#[derive(Debug, Error)]
pub enum PtyError {
    #[error("empty command line")]
    EmptyCommand,
    #[error("failed to open pty: {0}")]
    Open(String),
    #[error("failed to spawn {program}: {message}")]
    Spawn { program: String, message: String },
    #[error("pty I/O failed: {0}")]
    Io(String),
}

/// What to run inside a new pty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtySpec {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Variables removed from the inherited environment.
    pub env_remove: Vec<String>,
    pub rows: u16,
    pub cols: u16,
}

impl PtySpec {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            cwd: None,
            env: Vec::new(),
            env_remove: Vec::new(),
            rows: 24,
            cols: 80,
        }
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }

    pub fn size(mut self, rows: u16, cols: u16) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }
}

/// Starts processes on fresh pseudo-terminals.
pub trait PtyHost: Send + Sync + 'static {
    fn spawn(&self, spec: &PtySpec) -> Result<PtyProcess, PtyError>;
}

/// A child process and the master side of its pty.
pub struct PtyProcess {
    master: Mutex<Box<dyn MasterPty + Send>>,
    child: Mutex<Box<dyn Child + Send + Sync>>,
    pid: Option<u32>,
}

impl std::fmt::Debug for PtyProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyProcess").field("pid", &self.pid).finish()
    }
}

impl PtyProcess {
    pub(crate) fn new(master: Box<dyn MasterPty + Send>, child: Box<dyn Child + Send + Sync>) -> Self {
        let pid = child.process_id();
        Self {
            master: Mutex::new(master),
            child: Mutex::new(child),
            pid,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// A blocking reader over everything the child prints.
    pub fn take_reader(&self) -> Result<Box<dyn Read + Send>, PtyError> {
        self.master
            .lock()
            .try_clone_reader()
            .map_err(|e| PtyError::Io(e.to_string()))
    }

    /// The input side of the pty. Can only be taken once.
    pub fn take_writer(&self) -> Result<Box<dyn Write + Send>, PtyError> {
        self.master
            .lock()
            .take_writer()
            .map_err(|e| PtyError::Io(e.to_string()))
    }

    pub fn resize(&self, rows: u16, cols: u16) -> Result<(), PtyError> {
        self.master
            .lock()
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Io(e.to_string()))
    }

    /// Current `(rows, cols)`.
    pub fn size(&self) -> Result<(u16, u16), PtyError> {
        let size = self
            .master
            .lock()
            .get_size()
            .map_err(|e| PtyError::Io(e.to_string()))?;
        Ok((size.rows, size.cols))
    }

    pub fn is_running(&self) -> bool {
        matches!(self.child.lock().try_wait(), Ok(None))
    }

    /// Hang up the child's process group, then kill and reap the child.
    ///
    /// Best-effort: a child that already exited is not an error.
    pub fn terminate(&self) {
        let mut child = self.child.lock();
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        if let Some(pid) = self.pid.and_then(|p| i32::try_from(p).ok()) {
            let group = nix::unistd::Pid::from_raw(pid);
            if let Err(e) = nix::sys::signal::killpg(group, nix::sys::signal::Signal::SIGHUP) {
                tracing::debug!(pid, error = %e, "killpg failed");
            }
        }
        if let Err(e) = child.kill() {
            tracing::debug!(pid = ?self.pid, error = %e, "kill failed");
        }
        if let Err(e) = child.wait() {
            tracing::debug!(pid = ?self.pid, error = %e, "wait failed");
        }
    }
}

#[cfg(test)]
#[path = "pty_tests.rs"]
mod tests;
