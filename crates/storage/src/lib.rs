// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the session broker

mod file;
mod record;
mod store;
mod tags;

pub use record::{NewRecord, SessionRecord};
pub use store::{JsonRecordStore, MemoryRecordStore, RecordStore, StoreError};
pub use tags::WindowTags;
