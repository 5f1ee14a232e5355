// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ncfdctl daemon` — start/stop/status/restart/logs for the `ncfd`
//! backend process itself. Unlike every other command group this one
//! manages the process, not a datastore, so it talks to
//! `daemon_process`/`DaemonClient::connect` directly instead of issuing
//! one of the dispatch-table RPCs.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::io::{BufRead, BufReader};

use crate::client::{ClientError, DaemonClient};
use crate::daemon_process::{daemon_dir, probe_socket, read_daemon_pid};
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: Option<DaemonCommand>,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background (or --foreground for debugging)
    Start {
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop {
        /// Skip the graceful SIGTERM wait and kill immediately
        #[arg(long)]
        kill: bool,
    },
    /// Check whether the daemon is running
    Status,
    /// Stop, then start the daemon again
    Restart {
        #[arg(long)]
        kill: bool,
    },
    /// Print the tail of the daemon log
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "200")]
        limit: usize,
    },
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        Some(DaemonCommand::Start { foreground }) => start(foreground).await,
        Some(DaemonCommand::Stop { kill }) => stop(kill).await,
        Some(DaemonCommand::Restart { kill }) => {
            stop(kill).await?;
            start(false).await
        }
        Some(DaemonCommand::Status) | None => status(format).await,
        Some(DaemonCommand::Logs { limit }) => logs(limit),
    }
}

async fn start(foreground: bool) -> Result<()> {
    if foreground {
        let binary = std::env::var("NCFD_DAEMON_BINARY").unwrap_or_else(|_| "ncfd".to_string());
        let status = std::process::Command::new(binary).status()?;
        if !status.success() {
            return Err(anyhow!("daemon exited with status: {status}"));
        }
        return Ok(());
    }

    match DaemonClient::connect() {
        Ok(_) => {
            println!("daemon already running");
            Ok(())
        }
        Err(ClientError::DaemonNotRunning) => {
            DaemonClient::connect_or_start()?;
            println!("daemon started");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn stop(kill: bool) -> Result<()> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => {
            println!("daemon not running");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    client.shutdown(kill).await?;
    println!("daemon stopped");
    Ok(())
}

async fn status(format: OutputFormat) -> Result<()> {
    let socket_path = crate::daemon_process::daemon_socket()?;
    let running = socket_path.exists() && probe_socket(&socket_path);

    if !running {
        let obj = serde_json::json!({ "running": false });
        return format_or_json(format, &obj, || println!("daemon not running"));
    }

    let client = DaemonClient::for_query()?;
    client.ping().await?;
    let pid = read_daemon_pid()?;
    let version = DaemonClient::version_on_disk();

    let obj = serde_json::json!({
        "running": true,
        "pid": pid,
        "socket": socket_path.display().to_string(),
        "version": version,
    });
    format_or_json(format, &obj, || {
        println!("daemon running");
        if let Some(pid) = pid {
            println!("  pid:     {}", crate::color::context(&pid.to_string()));
        }
        println!("  socket:  {}", socket_path.display());
        if let Some(v) = &version {
            println!("  version: {v}");
        }
    })
}

fn logs(limit: usize) -> Result<()> {
    let log_path = daemon_dir()?.join("daemon.log");
    let file = std::fs::File::open(&log_path)
        .map_err(|_| anyhow!("no log file at {}", log_path.display()))?;
    let lines: Vec<String> = BufReader::new(file).lines().collect::<std::io::Result<_>>()?;
    let start = lines.len().saturating_sub(limit);
    for line in &lines[start..] {
        println!("{line}");
    }
    Ok(())
}
