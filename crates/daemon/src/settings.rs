// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `config.toml` settings and their `SB_*` environment overrides.
//!
//! Every field is optional; anything unset keeps the broker default. The
//! file is applied first, then the environment, then the result is checked
//! and turned into a [`BrokerConfig`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sb_core::Tool;
use sb_engine::{AccountStrategy, BrokerConfig};
use serde::Deserialize;

use crate::lifecycle::LifecycleError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub default_tool: Option<String>,
    pub fallback_shell: Option<String>,
    /// Tool name → command line. An empty command disables the tool.
    pub tools: BTreeMap<String, String>,
    pub rows: Option<u16>,
    pub cols: Option<u16>,
    pub persistent: Option<bool>,
    pub reconnect_persistent: Option<bool>,
    pub keepalive_ms: Option<u64>,
    pub poll_ms: Option<u64>,
    pub queue_capacity: Option<usize>,
    pub accounts: Option<AccountStrategy>,
    pub service_account: Option<String>,
    pub instance_dir: Option<PathBuf>,
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T, LifecycleError> {
    value
        .trim()
        .parse()
        .map_err(|_| LifecycleError::Config(format!("{name}: invalid value {value:?}")))
}

fn parse_flag(name: &str, value: &str) -> Result<bool, LifecycleError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(LifecycleError::Config(format!(
            "{name}: expected a boolean, got {value:?}"
        ))),
    }
}

fn tool(name: &str) -> Result<Tool, LifecycleError> {
    Tool::from_str(name).map_err(|e| LifecycleError::Config(e.to_string()))
}

impl Settings {
    pub fn parse(text: &str) -> Result<Self, LifecycleError> {
        Ok(toml::from_str(text)?)
    }

    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, LifecycleError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Overlay `SB_*` variables found through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), LifecycleError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SB_DEFAULT_TOOL") {
            self.default_tool = Some(v.trim().to_string());
        }
        if let Some(v) = get("SB_DEFAULT_SHELL") {
            self.fallback_shell = Some(v.trim().to_string());
        }
        for t in Tool::ALL {
            let name = format!("SB_{}_COMMAND", t.as_str().to_ascii_uppercase());
            if let Some(v) = lookup(&name) {
                self.tools.insert(t.as_str().to_string(), v.trim().to_string());
            }
        }
        if let Some(v) = get("SB_DEFAULT_ROWS") {
            self.rows = Some(parse_env("SB_DEFAULT_ROWS", &v)?);
        }
        if let Some(v) = get("SB_DEFAULT_COLS") {
            self.cols = Some(parse_env("SB_DEFAULT_COLS", &v)?);
        }
        if let Some(v) = get("SB_PERSISTENT") {
            self.persistent = Some(parse_flag("SB_PERSISTENT", &v)?);
        }
        if let Some(v) = get("SB_RECONNECT_PERSISTENT") {
            self.reconnect_persistent = Some(parse_flag("SB_RECONNECT_PERSISTENT", &v)?);
        }
        if let Some(v) = get("SB_KEEPALIVE_MS") {
            self.keepalive_ms = Some(parse_env("SB_KEEPALIVE_MS", &v)?);
        }
        if let Some(v) = get("SB_POLL_MS") {
            self.poll_ms = Some(parse_env("SB_POLL_MS", &v)?);
        }
        Ok(())
    }

    /// Validate and build the broker configuration.
    pub fn into_broker_config(self, state_dir: &Path) -> Result<BrokerConfig, LifecycleError> {
        let mut config = BrokerConfig::new(state_dir);

        if let Some(name) = &self.default_tool {
            config.tools.default_tool = tool(name)?;
        }
        if let Some(shell) = self.fallback_shell {
            config.tools.fallback_shell = shell;
        }
        for (name, command) in self.tools {
            let t = tool(&name)?;
            if command.trim().is_empty() {
                config.tools.commands.remove(&t);
            } else {
                config.tools.commands.insert(t, command);
            }
        }

        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.cols = cols;
        }
        if config.rows == 0 || config.cols == 0 {
            return Err(LifecycleError::Config(format!(
                "terminal size must be positive, got {}x{}",
                config.rows, config.cols
            )));
        }

        if let Some(v) = self.persistent {
            config.persistent = v;
        }
        if let Some(v) = self.reconnect_persistent {
            config.reconnect_persistent = v;
        }
        match self.keepalive_ms {
            Some(0) => return Err(LifecycleError::Config("keepalive_ms must be positive".into())),
            Some(ms) => config.keepalive = Duration::from_millis(ms),
            None => {}
        }
        match self.poll_ms {
            Some(0) => return Err(LifecycleError::Config("poll_ms must be positive".into())),
            Some(ms) => config.poll_interval = Duration::from_millis(ms),
            None => {}
        }
        match self.queue_capacity {
            Some(0) => {
                return Err(LifecycleError::Config("queue_capacity must be positive".into()))
            }
            Some(n) => config.queue_capacity = n,
            None => {}
        }
        if let Some(accounts) = self.accounts {
            config.accounts = accounts;
        }
        if let Some(account) = self.service_account.filter(|a| !a.trim().is_empty()) {
            config.service_account = Some(account);
        }
        if let Some(dir) = self.instance_dir {
            config.instance_dir = dir;
        }
        Ok(config)
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
