//! Test helpers for behavioral specifications.
//!
//! Spawns the sbd binary against an isolated state directory and talks
//! to it over its Unix socket.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use sb_daemon::protocol::{decode, encode_framed, Request, Response};

// Spec polling timeouts
pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

const IPC_TIMEOUT: Duration = Duration::from_secs(2);

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR does not point at the shared target directory.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// Returns the path to the sbd daemon binary.
pub fn sbd_binary() -> PathBuf {
    binary_path("sbd")
}

/// Poll a condition until it returns true or timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);
    let poll_interval = Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

// =============================================================================
// Project
// =============================================================================

/// Isolated state directory plus the daemon processes started in it.
pub struct Project {
    state_dir: tempfile::TempDir,
    daemons: Vec<Child>,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            state_dir: tempfile::tempdir().unwrap(),
            daemons: Vec::new(),
        }
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    pub fn socket_path(&self) -> PathBuf {
        self.state_path().join("daemon.sock")
    }

    pub fn config_path(&self) -> PathBuf {
        self.state_path().join("config.toml")
    }

    /// Write the daemon settings file
    pub fn config(&self, content: &str) {
        std::fs::write(self.config_path(), content).unwrap();
    }

    /// sbd command wired to this project's state directory
    pub fn sbd(&self) -> Command {
        let mut cmd = Command::new(sbd_binary());
        cmd.env("SB_STATE_DIR", self.state_path())
            .env("SB_CONFIG", self.config_path())
            .env_remove("SB_DEFAULT_TOOL")
            .env_remove("SB_DEFAULT_SHELL");
        cmd
    }

    /// Start the daemon and wait for it to print READY.
    pub fn start(&mut self) {
        let mut child = self
            .sbd()
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        let stdout = child.stdout.take().unwrap();
        let mut line = String::new();
        BufReader::new(stdout).read_line(&mut line).unwrap();
        assert_eq!(
            line.trim(),
            "READY",
            "daemon did not start\n{}",
            self.daemon_log()
        );
        self.daemons.push(child);
    }

    /// Send one request on a fresh connection and read the reply.
    pub fn request(&self, request: &Request) -> Response {
        let mut stream = UnixStream::connect(self.socket_path()).unwrap();
        stream.set_read_timeout(Some(IPC_TIMEOUT)).unwrap();
        stream.set_write_timeout(Some(IPC_TIMEOUT)).unwrap();

        stream.write_all(&encode_framed(request).unwrap()).unwrap();

        let mut len = [0u8; 4];
        stream.read_exact(&mut len).unwrap();
        let mut buf = vec![0u8; u32::from_be_bytes(len) as usize];
        stream.read_exact(&mut buf).unwrap();
        decode(&buf).unwrap()
    }

    /// Wait until every daemon started by this project has exited.
    pub fn wait_stopped(&mut self) -> bool {
        let daemons = &mut self.daemons;
        wait_for(SPEC_WAIT_MAX_MS, || {
            daemons
                .iter_mut()
                .all(|c| matches!(c.try_wait(), Ok(Some(_))))
        })
    }

    /// Read the daemon log file contents (for debugging test failures)
    pub fn daemon_log(&self) -> String {
        let log_path = self.state_path().join("daemon.log");
        std::fs::read_to_string(&log_path).unwrap_or_else(|_| "(no daemon log)".to_string())
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        for child in &mut self.daemons {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
