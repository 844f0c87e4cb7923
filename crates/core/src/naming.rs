// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic tmux session and window names.
//!
//! Window names follow `<workspace slug>-p<workspace id>` with an optional
//! `-i<issue id>` or `-<6 hex>` suffix. Only names in this shape are ever
//! removed by window sync.

use crate::owner::Owner;
use crate::workspace::{Workspace, WorkspaceId};

/// Lowercase a label and squash everything outside `[a-z0-9_-]` into single
/// dashes. May return an empty string.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Tmux session name for an owner; never blank.
pub fn session_name(owner: &Owner) -> String {
    owner
        .labels()
        .map(slugify)
        .find(|slug| !slug.is_empty())
        .unwrap_or_else(|| format!("user-{}", owner.id))
}

/// What a window is keyed on inside its workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WindowKey {
    /// The workspace's shared window.
    Workspace,
    /// One window per tracked issue, reused across sessions.
    Issue(u64),
    /// One-off window with a random disambiguator.
    Scratch(String),
}

/// Generated window name for a workspace and key.
pub fn window_name(workspace: &Workspace, key: &WindowKey) -> String {
    let slug = slugify(&workspace.name);
    let base = if slug.is_empty() {
        format!("project-p{}", workspace.id)
    } else {
        format!("{}-p{}", slug, workspace.id)
    };
    match key {
        WindowKey::Workspace => base,
        WindowKey::Issue(issue) => format!("{base}-i{issue}"),
        WindowKey::Scratch(hex) => format!("{base}-{hex}"),
    }
}

/// A window name that parses as one the broker generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedWindow {
    pub workspace_id: WorkspaceId,
    pub key: WindowKey,
}

/// Parse a generated window name; `None` for user-created windows.
pub fn parse_window_name(name: &str) -> Option<GeneratedWindow> {
    let parts: Vec<&str> = name.split('-').collect();
    let (last, rest) = parts.split_last()?;

    if let Some(workspace_id) = workspace_part(last) {
        return (!rest.is_empty()).then_some(GeneratedWindow {
            workspace_id,
            key: WindowKey::Workspace,
        });
    }

    let (prev, prefix) = rest.split_last()?;
    let workspace_id = workspace_part(prev)?;
    if prefix.is_empty() {
        return None;
    }
    let key = if let Some(issue) = last.strip_prefix('i').and_then(parse_digits) {
        WindowKey::Issue(issue)
    } else if last.len() == 6 && last.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
        WindowKey::Scratch((*last).to_string())
    } else {
        return None;
    };
    Some(GeneratedWindow { workspace_id, key })
}

fn workspace_part(part: &str) -> Option<WorkspaceId> {
    part.strip_prefix('p').and_then(parse_digits)
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod tests;
