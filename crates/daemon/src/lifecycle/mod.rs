// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, crash recovery.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use ncfd_engine::Engine;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::notify::NotificationBus;
use crate::session::SessionRegistry;

/// Daemon configuration: every path the daemon touches under its state
/// directory (§6 "State directory layout").
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. `~/.local/state/ncfd`).
    pub state_dir: PathBuf,
    /// Path to the Unix socket.
    pub socket_path: PathBuf,
    /// Path to the lock/PID file.
    pub lock_path: PathBuf,
    /// Path to the version file.
    pub version_path: PathBuf,
    /// Path to the daemon log file.
    pub log_path: PathBuf,
    /// Path to the optional crash-recovery snapshot.
    pub snapshot_path: PathBuf,
    /// Path to a schema file, when one is configured.
    pub schema_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration for the user-level daemon. One daemon serves
    /// every client for a user; there is no per-project daemon.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = crate::env::state_dir()?;
        let schema_path =
            std::env::var("NCFD_SCHEMA_PATH").ok().map(PathBuf::from).filter(|p| p.exists());

        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            snapshot_path: state_dir.join("snapshot.json"),
            schema_path,
            state_dir,
        })
    }
}

/// Daemon state during operation. Owns the engine, the session registry,
/// and the notification bus behind the single lock the dispatcher
/// serializes every request through (§5 "single-threaded dispatch").
pub struct Daemon {
    pub config: Config,
    // Held to maintain the exclusive file lock; released on drop.
    #[allow(dead_code)]
    lock_file: File,
    pub engine: Arc<Mutex<Engine>>,
    pub sessions: Arc<parking_lot::Mutex<SessionRegistry>>,
    pub notify_bus: Arc<NotificationBus>,
    pub start_time: Instant,
}

impl Daemon {
    /// Shut down gracefully: remove the socket, PID, and version files in
    /// that order. The exclusive lock itself is released when `lock_file`
    /// drops along with `self`.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("shutting down daemon");

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!(error = %e, "failed to remove socket file");
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!(error = %e, "failed to remove PID file");
            }
        }
        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!(error = %e, "failed to remove version file");
            }
        }

        info!("daemon shutdown complete");
        Ok(())
    }
}

/// Result of daemon startup: the daemon state plus the listeners to spawn
/// as a task and the fired-timer channel the main loop drains.
pub struct StartupResult {
    pub daemon: Daemon,
    pub unix_listener: tokio::net::UnixListener,
    pub tcp_listener: Option<tokio::net::TcpListener>,
    pub timer_rx: tokio::sync::mpsc::UnboundedReceiver<ncfd_core::TimerId>,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("schema error: {0}")]
    Schema(#[from] ncfd_schema::SchemaError),

    #[error("storage error: {0}")]
    Storage(#[from] ncfd_storage::StorageError),

    #[error("engine error: {0}")]
    Engine(#[from] ncfd_engine::EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn config_load_honors_ncfd_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("NCFD_STATE_DIR", dir.path());
        let config = Config::load().unwrap();
        assert_eq!(config.state_dir, dir.path());
        assert_eq!(config.socket_path, dir.path().join("daemon.sock"));
        std::env::remove_var("NCFD_STATE_DIR");
    }
}
