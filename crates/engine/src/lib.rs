// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Session broker engine: windows, launcher, registry, relay, recovery

mod broker;
mod config;
mod error;
mod handle;
mod launcher;
mod recovery;
mod registry;
mod relay;
mod windows;

pub use broker::{Broker, BrokerDeps, CreateSession, CreatedSession, HistoryEntry, Validation};
pub use config::{AccountStrategy, BrokerConfig};
pub use error::BrokerError;
pub use handle::SessionHandle;
pub use recovery::RecoveryReport;
pub use registry::{RegisterError, Registry};
pub use relay::FrameStream;
pub use windows::{EnsuredWindow, SyncReport, WindowResolver};
