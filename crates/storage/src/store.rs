// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session record stores

use crate::file::{load_json, save_json};
use crate::record::{NewRecord, SessionRecord};
use chrono::Utc;
use parking_lot::Mutex;
use sb_core::{SessionFilter, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from record persistence
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session record not found: {0}")]
    NotFound(u64),
}

/// Durable session records.
///
/// Implementations are synchronous; each call is a short in-memory update
/// plus at most one small file write.
pub trait RecordStore: Send + Sync + 'static {
    /// Insert a record for a new session. A record already carrying the
    /// same session id is returned unchanged instead of duplicated.
    fn create(&self, record: NewRecord) -> Result<SessionRecord, StoreError>;

    fn get(&self, id: u64) -> Result<Option<SessionRecord>, StoreError>;

    fn find_by_session(&self, session_id: &SessionId)
        -> Result<Option<SessionRecord>, StoreError>;

    /// Matching records, newest first.
    fn list(&self, filter: &SessionFilter) -> Result<Vec<SessionRecord>, StoreError>;

    /// Records still flagged active, oldest first.
    fn active(&self) -> Result<Vec<SessionRecord>, StoreError>;

    /// Clear the active flag. The first `ended_at` wins.
    fn mark_ended(&self, id: u64) -> Result<SessionRecord, StoreError>;

    /// Bump `last_seen_at`.
    fn touch(&self, id: u64) -> Result<(), StoreError>;
}

/// On-disk shape shared by every store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RecordSet {
    next_id: u64,
    records: BTreeMap<u64, SessionRecord>,
}

impl RecordSet {
    fn create(&mut self, record: NewRecord) -> SessionRecord {
        if let Some(existing) = self.find_by_session(&record.session_id) {
            return existing;
        }
        self.next_id = self.next_id.max(self.records.keys().last().copied().unwrap_or(0)) + 1;
        let record = record.into_record(self.next_id, Utc::now());
        self.records.insert(record.id, record.clone());
        record
    }

    fn find_by_session(&self, session_id: &SessionId) -> Option<SessionRecord> {
        self.records
            .values()
            .find(|r| &r.session_id == session_id)
            .cloned()
    }

    fn list(&self, filter: &SessionFilter) -> Vec<SessionRecord> {
        self.records
            .values()
            .rev()
            .filter(|r| r.matches(filter))
            .cloned()
            .collect()
    }

    fn active(&self) -> Vec<SessionRecord> {
        self.records.values().filter(|r| r.active).cloned().collect()
    }

    fn mark_ended(&mut self, id: u64) -> Result<SessionRecord, StoreError> {
        let record = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.active = false;
        if record.ended_at.is_none() {
            record.ended_at = Some(Utc::now());
        }
        Ok(record.clone())
    }

    fn touch(&mut self, id: u64) -> Result<(), StoreError> {
        let record = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.last_seen_at = Utc::now();
        Ok(())
    }
}

/// Record store kept only in memory.
#[derive(Default)]
pub struct MemoryRecordStore {
    set: Mutex<RecordSet>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn create(&self, record: NewRecord) -> Result<SessionRecord, StoreError> {
        Ok(self.set.lock().create(record))
    }

    fn get(&self, id: u64) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.set.lock().records.get(&id).cloned())
    }

    fn find_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.set.lock().find_by_session(session_id))
    }

    fn list(&self, filter: &SessionFilter) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.set.lock().list(filter))
    }

    fn active(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.set.lock().active())
    }

    fn mark_ended(&self, id: u64) -> Result<SessionRecord, StoreError> {
        self.set.lock().mark_ended(id)
    }

    fn touch(&self, id: u64) -> Result<(), StoreError> {
        self.set.lock().touch(id)
    }
}

/// Record store persisted as a single JSON file, rewritten on every change.
pub struct JsonRecordStore {
    path: PathBuf,
    set: Mutex<RecordSet>,
}

impl JsonRecordStore {
    /// Open (or start) the store at `path`. A corrupt file is set aside.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let set: RecordSet = load_json(&path)?.unwrap_or_default();
        tracing::debug!(path = %path.display(), records = set.records.len(), "opened record store");
        Ok(Self {
            path,
            set: Mutex::new(set),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut RecordSet) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut set = self.set.lock();
        let result = f(&mut set)?;
        save_json(&self.path, &*set)?;
        Ok(result)
    }
}

impl RecordStore for JsonRecordStore {
    fn create(&self, record: NewRecord) -> Result<SessionRecord, StoreError> {
        self.update(|set| Ok(set.create(record)))
    }

    fn get(&self, id: u64) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.set.lock().records.get(&id).cloned())
    }

    fn find_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.set.lock().find_by_session(session_id))
    }

    fn list(&self, filter: &SessionFilter) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.set.lock().list(filter))
    }

    fn active(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.set.lock().active())
    }

    fn mark_ended(&self, id: u64) -> Result<SessionRecord, StoreError> {
        self.update(|set| set.mark_ended(id))
    }

    fn touch(&self, id: u64) -> Result<(), StoreError> {
        self.update(|set| set.touch(id))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
