// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use tokio::net::UnixStream;

use ncfd_core::error::RpcError;
use ncfd_core::Operation;
use ncfd_wire::{self as wire, ConfirmedCommitOutcome, ProtocolError, Request, Response};

use crate::daemon_process::{
    cleanup_stale_socket, daemon_dir, daemon_socket, probe_socket, read_startup_error,
    start_daemon_background, stop_daemon_sync, wrap_with_startup_error,
};

/// Timeout for a single IPC round-trip.
pub fn timeout_ipc() -> Duration {
    crate::env::timeout_ipc_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout waiting for a newly spawned daemon to start accepting connections.
pub fn timeout_connect() -> Duration {
    crate::env::timeout_connect_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout waiting for a stopped daemon's process to actually exit.
pub fn timeout_exit() -> Duration {
    crate::env::timeout_exit_ms().unwrap_or(Duration::from_secs(2))
}

/// Polling interval for connection retries while a daemon starts.
pub fn poll_interval() -> Duration {
    crate::env::connect_poll_ms().unwrap_or(Duration::from_millis(50))
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running")]
    DaemonNotRunning,

    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("timed out waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Rejected(#[from] RpcError),

    #[error("unexpected response from daemon")]
    UnexpectedResponse,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not determine state directory")]
    NoStateDir,
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::DaemonNotRunning)
    }
}

/// `commit`'s reply: a plain commit replies `Response::Ok`, a confirmed
/// one replies `Response::CommitOutcome` (§6 "commit").
pub enum CommitResult {
    Plain,
    Confirmed(ConfirmedCommitOutcome),
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For commands that mutate datastore state (edit-config, commit, ...).
    /// Auto-starts the daemon, but restarts it at most once per process.
    pub fn for_action() -> Result<Self, ClientError> {
        Self::connect_or_start_once()
    }

    /// For read-only commands (get-config, islocked, daemon status, ...).
    /// Connects only; there's nothing useful to query from a cold start.
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    fn connect_or_start_once() -> Result<Self, ClientError> {
        static RESTARTED: AtomicBool = AtomicBool::new(false);
        if RESTARTED.load(Ordering::SeqCst) {
            return Self::connect();
        }

        match Self::connect() {
            Ok(client) => {
                if probe_socket(&client.socket_path) {
                    Ok(client)
                } else {
                    RESTARTED.store(true, Ordering::SeqCst);
                    stop_daemon_sync();
                    cleanup_stale_socket()?;
                    let child = start_daemon_background()?;
                    Self::connect_with_retry(timeout_connect(), child)
                }
            }
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child)
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    /// Connect to an existing daemon. Does not start one.
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket()?;
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }
        Ok(Self { socket_path })
    }

    /// Connect, starting the daemon in the background if it isn't running.
    pub fn connect_or_start() -> Result<Self, ClientError> {
        match Self::connect() {
            Ok(client) => {
                if probe_socket(&client.socket_path) {
                    Ok(client)
                } else {
                    cleanup_stale_socket()?;
                    let child = start_daemon_background()?;
                    Self::connect_with_retry(timeout_connect(), child)
                }
            }
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child)
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    fn connect_with_retry(timeout: Duration, mut child: std::process::Child) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Ok(Some(status)) = child.try_wait() {
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error() {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    std::thread::sleep(poll_interval());
                }
                return Err(ClientError::DaemonStartFailed(format!("exited with {status}")));
            }

            match Self::connect() {
                Ok(client) => return Ok(client),
                Err(ClientError::DaemonNotRunning) => std::thread::sleep(poll_interval()),
                Err(e) => return Err(wrap_with_startup_error(e)),
            }
        }
        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    async fn send_with_timeout(
        &self,
        request: &Request,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        let data = wire::encode(request)?;
        tokio::time::timeout(write_timeout, wire::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let response_bytes = tokio::time::timeout(read_timeout, wire::read_message(&mut reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        Ok(wire::decode(&response_bytes)?)
    }

    /// Send a request and get back whatever the daemon replies, verbatim.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        self.send_with_timeout(request, timeout_ipc(), timeout_ipc()).await
    }

    /// Send a request that only ever replies `Ok` or `Error`.
    async fn send_simple(&self, request: &Request) -> Result<(), ClientError> {
        match self.send(request).await? {
            Response::Ok => Ok(()),
            Response::Error(e) => Err(ClientError::Rejected(e)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    fn reject<T>(resp: Response) -> Result<T, ClientError> {
        match resp {
            Response::Error(e) => Err(ClientError::Rejected(e)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn get_config(&self, source: &str, filter: Option<&str>) -> Result<Value, ClientError> {
        let req = Request::GetConfig { source: source.to_string(), filter: filter.map(String::from) };
        match self.send(&req).await? {
            Response::Data(v) => Ok(v),
            other => Self::reject(other),
        }
    }

    pub async fn get(&self, filter: Option<&str>) -> Result<Value, ClientError> {
        let req = Request::Get { filter: filter.map(String::from) };
        match self.send(&req).await? {
            Response::Data(v) => Ok(v),
            other => Self::reject(other),
        }
    }

    pub async fn edit_config(
        &self,
        target: &str,
        default_operation: Option<Operation>,
        config: Value,
    ) -> Result<(), ClientError> {
        let req = Request::EditConfig { target: target.to_string(), default_operation, config };
        self.send_simple(&req).await
    }

    pub async fn copy_config(&self, source: &str, target: &str) -> Result<(), ClientError> {
        let req = Request::CopyConfig { source: source.to_string(), target: target.to_string() };
        self.send_simple(&req).await
    }

    pub async fn delete_config(&self, target: &str) -> Result<(), ClientError> {
        self.send_simple(&Request::DeleteConfig { target: target.to_string() }).await
    }

    pub async fn lock(&self, target: &str) -> Result<(), ClientError> {
        self.send_simple(&Request::Lock { target: target.to_string() }).await
    }

    pub async fn unlock(&self, target: &str) -> Result<(), ClientError> {
        self.send_simple(&Request::Unlock { target: target.to_string() }).await
    }

    pub async fn is_locked(&self, target: &str) -> Result<Option<u32>, ClientError> {
        match self.send(&Request::IsLocked { target: target.to_string() }).await? {
            Response::LockStatus(holder) => Ok(holder),
            other => Self::reject(other),
        }
    }

    pub async fn close_session(&self) -> Result<(), ClientError> {
        self.send_simple(&Request::CloseSession).await
    }

    pub async fn kill_session(&self, session_id: u32) -> Result<(), ClientError> {
        self.send_simple(&Request::KillSession { session_id }).await
    }

    pub async fn validate(&self, source: &str) -> Result<(bool, Vec<String>), ClientError> {
        match self.send(&Request::Validate { source: source.to_string() }).await? {
            Response::ValidateReport { ok, violations } => Ok((ok, violations)),
            other => Self::reject(other),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn commit(
        &self,
        confirmed: bool,
        confirm_timeout_secs: Option<u64>,
        persist: Option<String>,
        persist_id: Option<String>,
    ) -> Result<CommitResult, ClientError> {
        let req = Request::Commit { confirmed, confirm_timeout_secs, persist, persist_id };
        match self.send(&req).await? {
            Response::Ok => Ok(CommitResult::Plain),
            Response::CommitOutcome(outcome) => Ok(CommitResult::Confirmed(outcome)),
            other => Self::reject(other),
        }
    }

    pub async fn discard_changes(&self) -> Result<(), ClientError> {
        self.send_simple(&Request::DiscardChanges).await
    }

    pub async fn cancel_commit(&self, persist_id: Option<String>) -> Result<(), ClientError> {
        self.send_simple(&Request::CancelCommit { persist_id }).await
    }

    /// Subscribe on a dedicated connection and invoke `on_event` for every
    /// notification pushed until the connection closes or `stop` resolves.
    /// Unlike every other RPC, a subscription's replies keep arriving on
    /// the same connection long after the initial ack (§4.5, §6).
    pub async fn subscribe(
        &self,
        stream: Option<String>,
        filter: Option<String>,
        mut on_event: impl FnMut(serde_json::Value),
        stop: impl std::future::Future<Output = ()>,
    ) -> Result<(), ClientError> {
        let conn = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = conn.into_split();

        let req = Request::CreateSubscription { stream, filter };
        let data = wire::encode(&req)?;
        wire::write_message(&mut writer, &data).await?;

        let ack_bytes = wire::read_message(&mut reader).await?;
        match wire::decode(&ack_bytes)? {
            Response::Ok => {}
            Response::Error(e) => return Err(ClientError::Rejected(e)),
            _ => return Err(ClientError::UnexpectedResponse),
        }

        tokio::pin!(stop);
        loop {
            tokio::select! {
                msg = wire::read_message(&mut reader) => {
                    match msg {
                        Ok(bytes) => match wire::decode(&bytes)? {
                            Response::Notification(event) => on_event(serde_json::to_value(event)?),
                            _ => {}
                        },
                        Err(ProtocolError::ConnectionClosed) => return Ok(()),
                        Err(e) => return Err(e.into()),
                    }
                }
                _ = &mut stop => return Ok(()),
            }
        }
    }

    pub async fn debug_level(&self, level: u8) -> Result<(), ClientError> {
        self.send_simple(&Request::Debug { level }).await
    }

    pub async fn custom_rpc(&self, operation: String, payload: Value) -> Result<Response, ClientError> {
        self.send(&Request::CustomRpc { operation, payload }).await
    }

    /// Daemon version via the TCP `Hello` handshake's Unix-socket shortcut:
    /// Unix connections skip the handshake entirely, so this just checks
    /// the on-disk version file the daemon writes at startup.
    pub fn version_on_disk() -> Option<String> {
        let path = daemon_dir().ok()?.join("daemon.version");
        std::fs::read_to_string(path).ok().map(|s| s.trim().to_string())
    }

    /// Stop the daemon process. There's no shutdown RPC — the dispatch
    /// surface only tears down individual sessions — so this signals the
    /// process directly (§6 "Process signals"): SIGTERM and wait, falling
    /// back to SIGKILL if it's still alive after `kill`, or immediately
    /// if `kill` is set from the start.
    pub async fn shutdown(&self, kill: bool) -> Result<bool, ClientError> {
        use crate::daemon_process::{
            cleanup_stale_pid, force_kill_daemon, process_exists, read_daemon_pid, terminate_daemon,
            wait_for_exit,
        };

        let Some(pid) = read_daemon_pid()? else {
            return Ok(false);
        };

        if kill {
            force_kill_daemon(pid);
        } else {
            terminate_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
            if process_exists(pid) {
                force_kill_daemon(pid);
            }
        }
        wait_for_exit(pid, timeout_exit()).await;

        if let Ok(dir) = daemon_dir() {
            cleanup_stale_pid(&dir);
        }
        Ok(true)
    }
}
