// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Which tool each tmux window was last launched with.

use crate::file::{load_json, save_json};
use crate::StoreError;
use parking_lot::Mutex;
use sb_core::WindowTarget;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct WindowTag {
    tool: String,
}

/// `session:window` → tool label, optionally backed by a JSON file.
#[derive(Default)]
pub struct WindowTags {
    path: Option<PathBuf>,
    tags: Mutex<BTreeMap<String, WindowTag>>,
}

impl WindowTags {
    /// Tags that are never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tags = load_json(&path)?.unwrap_or_default();
        Ok(Self {
            path: Some(path),
            tags: Mutex::new(tags),
        })
    }

    pub fn record(&self, target: &WindowTarget, tool: &str) -> Result<(), StoreError> {
        let mut tags = self.tags.lock();
        tags.insert(
            target.to_string(),
            WindowTag {
                tool: tool.to_string(),
            },
        );
        self.save(&tags)
    }

    pub fn get(&self, target: &WindowTarget) -> Option<String> {
        self.tags
            .lock()
            .get(&target.to_string())
            .map(|t| t.tool.clone())
    }

    /// Drop tags for the given windows.
    pub fn remove<'a>(
        &self,
        targets: impl IntoIterator<Item = &'a WindowTarget>,
    ) -> Result<usize, StoreError> {
        let mut tags = self.tags.lock();
        let before = tags.len();
        for target in targets {
            tags.remove(&target.to_string());
        }
        let removed = before - tags.len();
        if removed > 0 {
            self.save(&tags)?;
        }
        Ok(removed)
    }

    /// Keep only tags whose window is in `live`. Returns how many were dropped.
    pub fn prune<'a>(
        &self,
        live: impl IntoIterator<Item = &'a WindowTarget>,
    ) -> Result<usize, StoreError> {
        let live: HashSet<String> = live.into_iter().map(|t| t.to_string()).collect();
        let mut tags = self.tags.lock();
        let before = tags.len();
        tags.retain(|target, _| live.contains(target));
        let pruned = before - tags.len();
        if pruned > 0 {
            tracing::debug!(pruned, "pruned stale window tags");
            self.save(&tags)?;
        }
        Ok(pruned)
    }

    fn save(&self, tags: &BTreeMap<String, WindowTag>) -> Result<(), StoreError> {
        match &self.path {
            Some(path) => save_json(path, tags),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "tags_tests.rs"]
mod tests;
