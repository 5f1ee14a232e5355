// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: lock acquisition, schema/storage/engine bootstrap,
//! crash recovery, and binding the listeners (§4.4 "Crash recovery").

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::Mutex;
use tracing::info;

use ncfd_engine::Engine;
use ncfd_plugin::PluginRegistry;
use ncfd_schema::SchemaRegistry;
use ncfd_storage::DatastoreRegistry;

use crate::notify::NotificationBus;
use crate::scheduler::TokioRollbackScheduler;
use crate::session::SessionRegistry;

use super::{Config, Daemon, LifecycleError, StartupResult};

/// Start the daemon. Wraps `startup_inner` so every failure path past
/// lock acquisition cleans up whatever files it created; a failure to
/// acquire the lock itself must *not* clean up, since those files belong
/// to the daemon already running.
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create the state directory.
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire the lock file first, to prevent a startup race against
    // another daemon process. Avoid truncating before the lock is held,
    // which would wipe a running daemon's PID.
    let lock_file =
        std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Write the version file.
    std::fs::write(&config.version_path, ncfd_wire::PROTOCOL_VERSION)?;

    // 4. Load the schema (or fall back to the permissive empty schema).
    let schema = match &config.schema_path {
        Some(path) => SchemaRegistry::load(path)?,
        None => SchemaRegistry::empty(),
    };

    // 5. Load storage from a snapshot if one exists, else bootstrap fresh.
    let storage = if config.snapshot_path.exists() {
        info!(path = %config.snapshot_path.display(), "loading datastore snapshot");
        DatastoreRegistry::load_snapshot(&config.snapshot_path)?
    } else {
        info!("no snapshot found, bootstrapping empty datastores");
        DatastoreRegistry::bootstrap()
    };

    // Plugin binary loading is a named external collaborator (spec
    // Non-goals): the registry starts empty, ready for a future loader to
    // populate before `init_all`/`start_all` are invoked.
    let plugins = PluginRegistry::new();
    plugins.init_all().await.map_err(ncfd_engine::EngineError::PluginRejected)?;
    plugins.start_all().await.map_err(ncfd_engine::EngineError::PluginRejected)?;

    let (timer_tx, timer_rx) = tokio::sync::mpsc::unbounded_channel();
    let scheduler = Arc::new(TokioRollbackScheduler::new(timer_tx));

    let mut engine = Engine::new(storage, schema, plugins, scheduler);
    engine.recover_from_crash(crate::env::boot_source()).await?;

    // 6. Remove a stale socket and bind (last, after every fallible step
    // has succeeded).
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let unix_listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    let tcp_listener = match crate::env::tcp_port() {
        Some(port) => {
            let addr = format!("0.0.0.0:{port}");
            Some(
                TcpListener::bind(&addr)
                    .await
                    .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?,
            )
        }
        None => None,
    };

    info!("daemon started");

    Ok(StartupResult {
        daemon: Daemon {
            config: config.clone(),
            lock_file,
            engine: Arc::new(Mutex::new(engine)),
            sessions: Arc::new(parking_lot::Mutex::new(SessionRegistry::new())),
            notify_bus: Arc::new(NotificationBus::new()),
            start_time: Instant::now(),
        },
        unix_listener,
        tcp_listener,
        timer_rx,
    })
}

fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn startup_binds_the_unix_socket_and_bootstraps_empty_datastores() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("NCFD_STATE_DIR", dir.path());
        std::env::remove_var("NCFD_TCP_PORT");
        std::env::remove_var("NCFD_SCHEMA_PATH");

        let config = Config::load().unwrap();
        let result = startup(&config).await.unwrap();

        assert!(config.socket_path.exists());
        assert!(config.version_path.exists());
        assert!(result.tcp_listener.is_none());
        {
            let engine = result.daemon.engine.lock().await;
            assert!(engine.exists("running"));
        }

        std::env::remove_var("NCFD_STATE_DIR");
    }

    #[tokio::test]
    #[serial]
    async fn a_second_startup_against_the_same_state_dir_fails_to_lock() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("NCFD_STATE_DIR", dir.path());
        std::env::remove_var("NCFD_TCP_PORT");
        std::env::remove_var("NCFD_SCHEMA_PATH");

        let config = Config::load().unwrap();
        let first = startup(&config).await.unwrap();

        let err = startup(&config).await.unwrap_err();
        assert!(matches!(err, LifecycleError::LockFailed(_)));
        // The first daemon's files must survive the second's failed attempt.
        assert!(config.socket_path.exists());

        drop(first);
        std::env::remove_var("NCFD_STATE_DIR");
    }
}
