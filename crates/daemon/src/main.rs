// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session Broker Daemon (sbd)
//!
//! Owns the tmux-backed interactive sessions of its users and serves them
//! over a Unix socket.
//!
//! Architecture:
//! - Listener Task: accepts connections, one task per connection
//! - Broker: session registry, window resolver, output relays
//! - Main task: waits for a shutdown request or signal

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod lifecycle;
mod listener;
mod settings;

use std::path::Path;
use std::sync::Arc;

use sb_daemon::protocol;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::info;

use crate::lifecycle::{Config, LifecycleError, StartupResult};
use crate::listener::Listener;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("sbd {VERSION}");
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("sbd {VERSION}");
                println!("Session Broker Daemon - hosts interactive tmux sessions for its users");
                println!();
                println!("USAGE:");
                println!("    sbd");
                println!();
                println!("Listens on a Unix socket under the state directory");
                println!("($SB_STATE_DIR, $XDG_STATE_HOME/sb or ~/.local/state/sb).");
                println!("Settings are read from $SB_CONFIG or <state dir>/config.toml.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: sbd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    std::fs::create_dir_all(&config.state_dir)?;
    rotate_log_if_needed(&config.log_path);

    // Write startup marker to log (before tracing setup, so clients can find it)
    write_startup_marker(&config)?;

    let _log_guard = setup_logging(&config)?;

    info!("Starting session broker daemon");

    let StartupResult {
        mut daemon,
        listener: unix_listener,
    } = match lifecycle::startup(&config).await {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("sbd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config, &e);
            return Err(e.into());
        }
    };

    let shutdown_notify = Arc::new(Notify::new());
    let listener = Listener::new(
        unix_listener,
        Arc::clone(&daemon.broker),
        Arc::clone(&shutdown_notify),
    );
    tokio::spawn(listener.run());

    // Reattach surviving sessions in the background so the socket is
    // responsive right away; requests that need it wait for the same scan.
    let broker = Arc::clone(&daemon.broker);
    tokio::spawn(async move {
        let report = broker.recover().await;
        if !report.is_empty() {
            info!(
                reconnected = report.reconnected.len(),
                unmatched = report.unmatched.len(),
                "startup recovery finished"
            );
        }
    });

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // Signal readiness to whoever launched us
    println!("READY");

    tokio::select! {
        _ = shutdown_notify.notified() => info!("Shutdown requested via command"),
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }

    daemon.shutdown()?;
    info!(uptime_secs = daemon.start_time.elapsed().as_secs(), "Daemon stopped");
    Ok(())
}

/// Rotate when the log exceeds this size.
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Rotated logs kept (daemon.log.1 .. daemon.log.3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Shift `daemon.log` → `.1` → `.2` → `.3` once it grows past the limit.
fn rotate_log_if_needed(path: &Path) {
    let size = match std::fs::metadata(path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size <= MAX_LOG_SIZE {
        return;
    }

    let path_str = path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let _ = std::fs::rename(format!("{path_str}.{i}"), format!("{path_str}.{}", i + 1));
    }
    let _ = std::fs::rename(path, format!("{path_str}.1"));
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- sbd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- sbd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
/// This keeps the error visible even if the process exits quickly.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
