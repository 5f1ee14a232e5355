// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured logging setup (§10.1) and the runtime level reload path the
//! `debug` RPC drives (§11 "Debug-level RPC").

use std::sync::OnceLock;

use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use crate::lifecycle::{Config, LifecycleError};

static RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, tracing_subscriber::Registry>> =
    OnceLock::new();

/// Map the wire-level `debug` RPC's `u8` (§11) onto a `tracing` directive.
/// `0` is the quietest; levels beyond `trace` saturate rather than error.
fn level_for(level: u8) -> &'static str {
    match level {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    }
}

/// Install the file-backed, env-filtered subscriber and stash the reload
/// handle so `set_runtime_level` can mutate it later from the dispatch loop.
pub fn setup(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config.log_path.file_name().ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    let _ = RELOAD_HANDLE.set(handle);
    Ok(guard)
}

/// Startup marker prefix written to the log before anything else. The CLI
/// scans for this to find where the current startup attempt begins when a
/// `daemon start` fails (`ncfd_cli::daemon_process::read_startup_error`).
pub const STARTUP_MARKER_PREFIX: &str = "--- ncfd: starting (pid: ";

/// Append the startup marker to the log file, ahead of the subscriber being
/// installed so it is visible even if `setup` itself fails.
pub fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

/// Write a startup failure synchronously to the log, so it is visible to
/// the CLI even if the process exits before the subscriber flushes.
pub fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR: failed to start daemon: {}", error);
}

/// Change the process-wide log level at runtime (§11 "Debug-level RPC").
/// A no-op if `setup` was never called (e.g. in unit tests that exercise
/// the dispatcher directly without a running subscriber).
pub fn set_runtime_level(level: u8) {
    let Some(handle) = RELOAD_HANDLE.get() else { return };
    let directive = level_for(level);
    if let Err(e) = handle.modify(|filter| *filter = EnvFilter::new(directive)) {
        tracing::warn!(error = %e, "failed to reload log level");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_for_saturates_past_trace() {
        assert_eq!(level_for(0), "error");
        assert_eq!(level_for(4), "trace");
        assert_eq!(level_for(255), "trace");
    }
}
