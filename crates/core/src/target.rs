// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `session:window` tmux targets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tmux target {0:?}: expected session:window")]
pub struct TargetParseError(pub String);

/// One tmux window, addressed as `session:window`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WindowTarget {
    pub session: String,
    pub window: String,
}

impl WindowTarget {
    pub fn new(session: impl Into<String>, window: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            window: window.into(),
        }
    }
}

impl fmt::Display for WindowTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.session, self.window)
    }
}

impl FromStr for WindowTarget {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((session, window)) if !session.is_empty() && !window.is_empty() => {
                Ok(Self::new(session, window))
            }
            _ => Err(TargetParseError(s.to_string())),
        }
    }
}

impl TryFrom<String> for WindowTarget {
    type Error = TargetParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WindowTarget> for String {
    fn from(target: WindowTarget) -> Self {
        target.to_string()
    }
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
