// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tmux CLI gateway, optionally re-issued through `sudo -n -u <account>`.
//!
//! tmux checks the UID of clients on its control socket, so another
//! account's server can only be driven by running tmux as that account.

use super::{GatewayError, TmuxGateway, TmuxOutput, WindowInfo, WINDOW_FORMAT};
use crate::subprocess::run_with_timeout;
use async_trait::async_trait;
use sb_core::WindowTarget;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct TmuxCli {
    binary: String,
    socket: Option<String>,
    account: Option<String>,
    service_account: Option<String>,
    timeout: Duration,
}

impl Default for TmuxCli {
    fn default() -> Self {
        Self {
            binary: crate::env::tmux_binary(),
            socket: None,
            account: None,
            service_account: std::env::var("USER").ok(),
            timeout: crate::env::tmux_timeout(),
        }
    }
}

impl TmuxCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account the broker itself runs as; commands for it skip sudo.
    pub fn with_service_account(mut self, account: Option<String>) -> Self {
        self.service_account = account;
        self
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Talk to a named server socket (`tmux -L <name>`) instead of the default.
    pub fn with_socket(mut self, name: impl Into<String>) -> Self {
        self.socket = Some(name.into());
        self
    }

    fn sudo_account(&self) -> Option<&str> {
        match (&self.account, &self.service_account) {
            (Some(account), Some(service)) if account == service => None,
            (Some(account), _) => Some(account.as_str()),
            (None, _) => None,
        }
    }

    /// Program and arguments for one tmux invocation.
    pub fn command_line(&self, args: &[&str]) -> (String, Vec<String>) {
        let socket = self
            .socket
            .iter()
            .flat_map(|name| ["-L".to_string(), name.clone()]);
        let tmux_args = socket.chain(args.iter().map(|a| a.to_string()));
        match self.sudo_account() {
            Some(account) => {
                let mut argv = vec![
                    "-n".to_string(),
                    "-u".to_string(),
                    account.to_string(),
                    self.binary.clone(),
                ];
                argv.extend(tmux_args);
                ("sudo".to_string(), argv)
            }
            None => (self.binary.clone(), tmux_args.collect()),
        }
    }

    async fn checked(&self, args: &[&str]) -> Result<TmuxOutput, GatewayError> {
        let description = describe(args);
        self.run(args).await?.check(&description)
    }
}

fn describe(args: &[&str]) -> String {
    match args.first() {
        Some(sub) => format!("tmux {sub}"),
        None => "tmux".to_string(),
    }
}

fn lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .filter(|l| !l.is_empty())
        .collect()
}

#[async_trait]
impl TmuxGateway for TmuxCli {
    fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    fn for_account(&self, account: Option<&str>) -> Self {
        Self {
            account: account.map(str::to_string),
            ..self.clone()
        }
    }

    fn attach_argv(&self, target: &WindowTarget) -> Vec<String> {
        let target = target.to_string();
        let (program, mut args) = self.command_line(&["attach-session", "-t", &target]);
        args.insert(0, program);
        args
    }

    async fn ensure_installed(&self) -> Result<(), GatewayError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-V");
        match run_with_timeout(cmd, self.timeout, "tmux -V").await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Err(GatewayError::NotInstalled(self.binary.clone())),
            Err(e) => Err(GatewayError::Io(e.to_string())),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<TmuxOutput, GatewayError> {
        let (program, argv) = self.command_line(args);
        let description = describe(args);
        let mut cmd = Command::new(&program);
        cmd.args(&argv);
        let output = run_with_timeout(cmd, self.timeout, &description)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    GatewayError::NotInstalled(program.clone())
                } else {
                    GatewayError::Io(e.to_string())
                }
            })?;

        let result = TmuxOutput {
            stdout: lines(&output.stdout),
            stderr: lines(&output.stderr),
            code: output.status.code().unwrap_or(-1),
        };
        if !result.success() {
            tracing::debug!(
                command = %description,
                account = self.account.as_deref(),
                code = result.code,
                stderr = %result.stderr.join("; "),
                "tmux exited non-zero"
            );
        }
        Ok(result)
    }

    async fn list_sessions(&self) -> Result<Vec<String>, GatewayError> {
        let output = self
            .run(&["list-sessions", "-F", "#{session_name}"])
            .await?;
        if output.is_missing_server() {
            return Ok(Vec::new());
        }
        Ok(output.check("tmux list-sessions")?.stdout)
    }

    async fn new_session(&self, name: &str, start_dir: &Path) -> Result<(), GatewayError> {
        let dir = start_dir.to_string_lossy();
        self.checked(&["new-session", "-d", "-s", name, "-c", &dir])
            .await?;
        // Scrolling is handled by the client; mouse mode would eat wheel events.
        let output = self.run(&["set-option", "-t", name, "mouse", "off"]).await?;
        if !output.success() {
            tracing::warn!(session = name, stderr = %output.stderr.join("; "), "unable to disable mouse");
        }
        Ok(())
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<WindowInfo>, GatewayError> {
        let output = self
            .run(&["list-windows", "-t", session, "-F", WINDOW_FORMAT])
            .await?;
        if output.is_missing_server() {
            return Ok(Vec::new());
        }
        let output = output.check("tmux list-windows")?;
        Ok(output.stdout.iter().filter_map(|l| WindowInfo::parse(l)).collect())
    }

    async fn list_all_windows(&self) -> Result<Vec<WindowTarget>, GatewayError> {
        let output = self
            .run(&["list-windows", "-a", "-F", "#{session_name}:#{window_name}"])
            .await?;
        if output.is_missing_server() {
            return Ok(Vec::new());
        }
        let output = output.check("tmux list-windows")?;
        Ok(output
            .stdout
            .iter()
            .filter_map(|l| l.parse().ok())
            .collect())
    }

    async fn new_window(
        &self,
        session: &str,
        name: &str,
        start_dir: &Path,
    ) -> Result<WindowInfo, GatewayError> {
        let dir = start_dir.to_string_lossy();
        let session_target = format!("{session}:");
        let output = self
            .checked(&[
                "new-window",
                "-d",
                "-t",
                &session_target,
                "-n",
                name,
                "-c",
                &dir,
                "-P",
                "-F",
                WINDOW_FORMAT,
            ])
            .await?;
        Ok(output
            .stdout
            .first()
            .and_then(|l| WindowInfo::parse(l))
            .unwrap_or_else(|| WindowInfo {
                target: WindowTarget::new(session, name),
                panes: 1,
                created: None,
            }))
    }

    async fn select_window(&self, target: &WindowTarget) -> Result<(), GatewayError> {
        let target = target.to_string();
        self.checked(&["select-window", "-t", &target]).await?;
        Ok(())
    }

    async fn pane_count(&self, target: &WindowTarget) -> Result<usize, GatewayError> {
        let target = target.to_string();
        let output = self
            .checked(&["list-panes", "-t", &target, "-F", "#{pane_id}"])
            .await?;
        Ok(output.stdout.len())
    }

    async fn has_window(&self, target: &WindowTarget) -> Result<bool, GatewayError> {
        let windows = self.list_windows(&target.session).await?;
        Ok(windows.iter().any(|w| w.target == *target))
    }

    async fn send_keys(
        &self,
        target: &WindowTarget,
        keys: &str,
        enter: bool,
    ) -> Result<(), GatewayError> {
        let target = target.to_string();
        let mut args = vec!["send-keys", "-t", target.as_str(), keys];
        if enter {
            args.push("Enter");
        }
        self.checked(&args).await?;
        Ok(())
    }

    async fn send_literal(&self, target: &WindowTarget, text: &str) -> Result<(), GatewayError> {
        let target = target.to_string();
        // -- ends option parsing so text may start with a dash
        self.checked(&["send-keys", "-t", &target, "-l", "--", text])
            .await?;
        Ok(())
    }

    async fn resize_window(
        &self,
        target: &WindowTarget,
        rows: u16,
        cols: u16,
    ) -> Result<(), GatewayError> {
        let target = target.to_string();
        let (rows, cols) = (rows.to_string(), cols.to_string());
        self.checked(&["resize-window", "-t", &target, "-x", &cols, "-y", &rows])
            .await?;
        Ok(())
    }

    async fn kill_window(&self, target: &WindowTarget) -> Result<(), GatewayError> {
        let target = target.to_string();
        self.checked(&["kill-window", "-t", &target]).await?;
        Ok(())
    }

    async fn set_option(
        &self,
        target: &WindowTarget,
        option: &str,
        value: &str,
    ) -> Result<(), GatewayError> {
        let target = target.to_string();
        self.checked(&["set-option", "-w", "-t", &target, option, value])
            .await?;
        Ok(())
    }

    async fn pipe_pane(&self, target: &WindowTarget, file: &Path) -> Result<(), GatewayError> {
        let target = target.to_string();
        let shell = format!(
            "cat >> {}",
            shell_words::quote(&file.to_string_lossy())
        );
        self.checked(&["pipe-pane", "-o", "-t", &target, &shell])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
