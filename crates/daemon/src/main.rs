// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ncfd — the configuration transaction daemon.
//!
//! A single long-running backend process that front-ends (the `ncfdctl`
//! CLI, a NETCONF server, an HTTP/REST gateway, an SNMP agent adaptor)
//! connect to over one transport connection each (spec §1). This binary
//! wires together lifecycle startup, the listener task, and the timer/
//! signal-driven main loop; `ncfd-daemon`'s library crate holds everything
//! with actual behavior.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;
use std::time::Instant;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use ncfd_daemon::env;
use ncfd_daemon::lifecycle::{self, Config, LifecycleError, StartupResult};
use ncfd_daemon::listener::{ListenCtx, Listener};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("ncfd {}", ncfd_wire::PROTOCOL_VERSION);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("ncfd {}", ncfd_wire::PROTOCOL_VERSION);
                println!("ncfd — NETCONF-style configuration transaction daemon");
                println!();
                println!("USAGE:");
                println!("    ncfd");
                println!();
                println!("The daemon is typically started by the `ncfdctl` CLI and should");
                println!("not be invoked directly. It listens on a Unix socket (and, when");
                println!("NCFD_TCP_PORT is set, a TCP socket) for RPC requests.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: ncfd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    ncfd_daemon::logging::write_startup_marker(&config)?;
    let log_guard = ncfd_daemon::logging::setup(&config)?;

    info!("starting ncfd");

    let StartupResult { mut daemon, unix_listener, tcp_listener, mut timer_rx } =
        match lifecycle::startup(&config).await {
            Ok(r) => r,
            Err(LifecycleError::LockFailed(_)) => {
                let pid = std::fs::read_to_string(&config.lock_path).unwrap_or_default();
                eprintln!("ncfd is already running");
                if !pid.trim().is_empty() {
                    eprintln!("  pid: {}", pid.trim());
                }
                std::process::exit(1);
            }
            Err(e) => {
                error!(error = %e, "failed to start daemon");
                ncfd_daemon::logging::write_startup_error(&config, &e);
                drop(log_guard);
                return Err(e.into());
            }
        };

    let ctx = Arc::new(ListenCtx {
        engine: Arc::clone(&daemon.engine),
        sessions: Arc::clone(&daemon.sessions),
        notify_bus: Arc::clone(&daemon.notify_bus),
        auth_token: env::auth_token(),
        start_time: Instant::now(),
    });

    let listener = match tcp_listener {
        Some(tcp) => Listener::with_tcp(unix_listener, tcp, ctx),
        None => Listener::new(unix_listener, ctx),
    };
    tokio::spawn(listener.run());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(socket = %config.socket_path.display(), "ncfd ready");
    println!("READY");

    loop {
        tokio::select! {
            Some(timer_id) = timer_rx.recv() => {
                let mut engine = daemon.engine.lock().await;
                if let Some(report) = engine.on_timer_fired(timer_id).await {
                    info!(?report, "confirmed-commit rollback timer fired");
                }
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    daemon.shutdown()?;
    info!("ncfd stopped");
    Ok(())
}
