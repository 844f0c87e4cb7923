// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supported interactive tools and command resolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from resolving a tool to a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("tool is not enabled: {0}")]
    UnsupportedTool(Tool),
}

/// Closed set of tools a session can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Claude,
    Codex,
    Gemini,
    Aider,
    Shell,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::Claude,
        Tool::Codex,
        Tool::Gemini,
        Tool::Aider,
        Tool::Shell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Claude => "claude",
            Tool::Codex => "codex",
            Tool::Gemini => "gemini",
            Tool::Aider => "aider",
            Tool::Shell => "shell",
        }
    }

    /// Command that reopens a previous conversation of this tool, if the tool
    /// supports resuming by id.
    pub fn resume_command(&self, base: &str, conversation_id: &str) -> Option<String> {
        match self {
            Tool::Claude => Some(format!("{base} --resume {conversation_id}")),
            Tool::Codex => Some(format!("{base} resume {conversation_id}")),
            Tool::Gemini | Tool::Aider | Tool::Shell => None,
        }
    }

    /// Guess the tool from the first word of a command line.
    pub fn detect(command: &str) -> Option<Tool> {
        let first = shell_words::split(command).ok()?.into_iter().next()?;
        let program = first.rsplit('/').next().unwrap_or(first.as_str());
        match program {
            "claude" => Some(Tool::Claude),
            "codex" => Some(Tool::Codex),
            "gemini" => Some(Tool::Gemini),
            "aider" => Some(Tool::Aider),
            "bash" | "sh" | "zsh" | "fish" => Some(Tool::Shell),
            _ => None,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// Configured command lines per tool plus defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolCommands {
    pub commands: BTreeMap<Tool, String>,
    pub default_tool: Tool,
    pub fallback_shell: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        let commands = [(Tool::Codex, "codex"), (Tool::Aider, "aider")]
            .into_iter()
            .map(|(tool, cmd)| (tool, cmd.to_string()))
            .collect();
        Self {
            commands,
            default_tool: Tool::Codex,
            fallback_shell: "/bin/bash".to_string(),
        }
    }
}

/// Outcome of resolving a create request to the command run in the pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub tool: Option<Tool>,
    pub command: String,
}

impl ToolCommands {
    pub fn command_for(&self, tool: Tool) -> Option<&str> {
        match self.commands.get(&tool) {
            Some(cmd) => Some(cmd.as_str()),
            None if tool == Tool::Shell => Some(self.fallback_shell.as_str()),
            None => None,
        }
    }

    /// Resolve the command for a create request.
    ///
    /// An explicit command wins; otherwise the named tool must be configured;
    /// otherwise the default tool, and finally the fallback shell.
    pub fn resolve(
        &self,
        tool: Option<&str>,
        command: Option<&str>,
        permission_mode: Option<&str>,
    ) -> Result<ResolvedCommand, ToolError> {
        let requested = tool
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Tool::from_str)
            .transpose()?;

        if let Some(command) = command.map(str::trim).filter(|c| !c.is_empty()) {
            return Ok(ResolvedCommand {
                tool: requested.or_else(|| Tool::detect(command)),
                command: command.to_string(),
            });
        }

        if let Some(tool) = requested {
            let base = self
                .command_for(tool)
                .ok_or(ToolError::UnsupportedTool(tool))?;
            return Ok(ResolvedCommand {
                tool: Some(tool),
                command: apply_permission_mode(tool, base, permission_mode),
            });
        }

        match self.command_for(self.default_tool) {
            Some(base) => Ok(ResolvedCommand {
                tool: Some(self.default_tool),
                command: apply_permission_mode(self.default_tool, base, permission_mode),
            }),
            None => Ok(ResolvedCommand {
                tool: Some(Tool::Shell),
                command: self.fallback_shell.clone(),
            }),
        }
    }
}

/// Set `--permission-mode <mode>` on a claude command line, replacing any
/// mode already present. Other tools are returned unchanged.
pub fn apply_permission_mode(tool: Tool, command: &str, mode: Option<&str>) -> String {
    let Some(mode) = mode.map(str::trim).filter(|m| !m.is_empty()) else {
        return command.to_string();
    };
    if tool != Tool::Claude {
        return command.to_string();
    }
    let Ok(words) = shell_words::split(command) else {
        return command.to_string();
    };

    let mut out = Vec::with_capacity(words.len() + 2);
    let mut iter = words.into_iter();
    while let Some(word) = iter.next() {
        if word == "--permission-mode" {
            iter.next();
            continue;
        }
        if word.starts_with("--permission-mode=") {
            continue;
        }
        out.push(word);
    }
    out.push("--permission-mode".to_string());
    out.push(mode.to_string());
    shell_words::join(out)
}

#[cfg(test)]
#[path = "tool_tests.rs"]
mod tests;
