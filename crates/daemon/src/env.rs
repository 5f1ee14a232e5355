// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use ncfd_engine::BootSource;
use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

pub const PROTOCOL_VERSION: &str = ncfd_wire::PROTOCOL_VERSION;

/// Resolve the state directory: `NCFD_STATE_DIR` > `$XDG_STATE_HOME/ncfd` >
/// `~/.local/state/ncfd`.
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("NCFD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("ncfd"));
    }
    dirs::home_dir().map(|home| home.join(".local/state/ncfd")).ok_or(LifecycleError::NoStateDir)
}

/// Request/reply read+write timeout for a single IPC round-trip.
pub fn ipc_timeout() -> Duration {
    std::env::var("NCFD_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// TCP port for remote sessions. When set, the daemon listens on this port
/// in addition to the Unix socket (§6 "process signals" says nothing about
/// transports; this mirrors the teacher's Kubernetes/Docker deployment
/// path for a front-end that cannot reach a Unix socket).
pub fn tcp_port() -> Option<u16> {
    std::env::var("NCFD_TCP_PORT").ok().and_then(|s| s.parse::<u16>().ok())
}

/// Auth token required in the `Hello` handshake for TCP connections. Unix
/// connections are trusted and never asked for it.
pub fn auth_token() -> Option<String> {
    std::env::var("NCFD_AUTH_TOKEN").ok().filter(|s| !s.is_empty())
}

/// Default `confirm-timeout` (§6) when a `commit` RPC omits it, overriding
/// `ncfd_core::commit::DEFAULT_CONFIRM_TIMEOUT`.
pub fn confirm_timeout_default() -> Duration {
    std::env::var("NCFD_CONFIRM_TIMEOUT_DEFAULT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(ncfd_core::commit::DEFAULT_CONFIRM_TIMEOUT)
}

/// How `running` got its contents this boot (§4.4 "Crash recovery"),
/// from `NCFD_BOOT_SOURCE` — `"running"` (default) or `"startup"`.
pub fn boot_source() -> BootSource {
    match std::env::var("NCFD_BOOT_SOURCE").as_deref() {
        Ok("startup") => BootSource::Startup,
        _ => BootSource::Running,
    }
}

/// Grace period given to in-flight requests on `SIGTERM`/`SIGINT` before
/// the daemon tears down sockets regardless (§6 "Process signals").
pub fn drain_timeout() -> Duration {
    std::env::var("NCFD_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}
