// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{PtyError, PtyHost, PtyProcess, PtySpec};
use portable_pty::{native_pty_system, CommandBuilder, PtySize};

/// Host backed by the platform's native pty implementation
#[derive(Debug, Clone, Default)]
pub struct NativePtyHost;

impl NativePtyHost {
    pub fn new() -> Self {
        Self
    }
}

impl PtyHost for NativePtyHost {
    fn spawn(&self, spec: &PtySpec) -> Result<PtyProcess, PtyError> {
        let (program, args) = spec.argv.split_first().ok_or(PtyError::EmptyCommand)?;

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: spec.rows,
                cols: spec.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        if let Some(cwd) = &spec.cwd {
            cmd.cwd(cwd);
        }
        for key in &spec.env_remove {
            cmd.env_remove(key);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::Spawn {
                program: program.clone(),
                message: e.to_string(),
            })?;
        // Keeping the slave open would hide EOF from readers once the child exits.
        drop(pair.slave);

        let process = PtyProcess::new(pair.master, child);
        tracing::debug!(program = %program, pid = ?process.pid(), rows = spec.rows, cols = spec.cols, "spawned pty");
        Ok(process)
    }
}
