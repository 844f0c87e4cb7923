// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: paths, startup, shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use sb_adapters::{NativePtyHost, TmuxCli, TracedTmux};
use sb_core::UuidIdGen;
use sb_engine::{Broker, BrokerConfig, BrokerDeps};
use sb_storage::{JsonRecordStore, StoreError, WindowTags};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::env;
use crate::protocol::PROTOCOL_VERSION;
use crate::settings::Settings;

/// Broker with the production adapters (wrapped with tracing)
pub type DaemonBroker = Broker<TracedTmux<TmuxCli>, NativePtyHost>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/sb)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Persisted session records
    pub records_path: PathBuf,
    /// Window → tool tags
    pub tags_path: PathBuf,
    /// Settings file (may not exist)
    pub settings_path: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Uses fixed paths under `~/.local/state/sb/` (or `$XDG_STATE_HOME/sb/`).
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        let settings_path = env::config_file().unwrap_or_else(|| state_dir.join("config.toml"));
        Ok(Self::new(state_dir, settings_path))
    }

    pub fn new(state_dir: PathBuf, settings_path: PathBuf) -> Self {
        Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            records_path: state_dir.join("sessions.json"),
            tags_path: state_dir.join("window-tools.json"),
            settings_path,
            state_dir,
        }
    }

    /// Settings file plus environment overrides, validated.
    pub fn broker_config(&self) -> Result<BrokerConfig, LifecycleError> {
        let mut settings = Settings::load(&self.settings_path)?;
        settings.apply_env(env::var)?;
        settings.into_broker_config(&self.state_dir)
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub broker: Arc<DaemonBroker>,
    pub start_time: Instant,
}

/// Result of daemon startup: the daemon state and the bound socket.
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
}

impl DaemonState {
    /// Shutdown the daemon gracefully.
    ///
    /// tmux sessions are left running; pipe-backed sessions are picked up
    /// again by recovery on the next start.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }
        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!("Failed to remove version file: {}", e);
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    // Configuration problems surface before anything is created on disk
    let broker_config = config.broker_config()?;

    match startup_inner(config, broker_config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock:
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

fn acquire_lock(path: &Path) -> Result<File, LifecycleError> {
    // Don't truncate before holding the lock; that would wipe the running
    // daemon's PID.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

async fn startup_inner(
    config: &Config,
    broker_config: BrokerConfig,
) -> Result<StartupResult, LifecycleError> {
    // 1. State directory, then the lock (prevents races)
    std::fs::create_dir_all(&config.state_dir)?;
    let lock_file = acquire_lock(&config.lock_path)?;
    std::fs::write(&config.version_path, PROTOCOL_VERSION)?;

    // 2. Working directories
    std::fs::create_dir_all(&broker_config.pipes_dir)?;
    if let Err(e) = std::fs::create_dir_all(&broker_config.instance_dir) {
        warn!(dir = %broker_config.instance_dir.display(), error = %e, "cannot create instance dir");
    }

    // 3. Stores
    let store = JsonRecordStore::open(&config.records_path)?;
    let tags = WindowTags::open(&config.tags_path)?;

    // 4. Broker
    let gateway = TracedTmux::new(
        TmuxCli::new().with_service_account(broker_config.service_account.clone()),
    );
    let broker = Broker::new(
        BrokerDeps {
            gateway,
            pty: NativePtyHost::new(),
            store: Arc::new(store),
            tags: Arc::new(tags),
            ids: Arc::new(UuidIdGen),
        },
        broker_config,
    );

    // 5. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!(socket = %config.socket_path.display(), "daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            broker: Arc::new(broker),
            start_time: Instant::now(),
        },
        listener,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    for path in [&config.socket_path, &config.version_path, &config.lock_path] {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
