// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ncfdctl - the command-line front-end for ncfd.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod color;
mod commands;
mod daemon_process;
mod env;
mod exit_error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{commit, config, custom_rpc, daemon, debug, lock, session};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "ncfdctl", version, about = "ncfdctl - configuration transaction client")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a datastore's configuration subtree
    GetConfig(config::GetConfigArgs),
    /// Read the effective running state (config + state data)
    Get(config::GetArgs),
    /// Edit a datastore's configuration
    EditConfig(config::EditConfigArgs),
    /// Copy one datastore's contents into another
    CopyConfig(config::CopyConfigArgs),
    /// Delete a datastore's contents
    DeleteConfig(config::DeleteConfigArgs),
    /// Validate a datastore against the schema without committing
    Validate(config::ValidateArgs),
    /// Discard uncommitted candidate edits
    DiscardChanges,
    /// Acquire an advisory lock on a datastore
    Lock(lock::LockArgs),
    /// Release an advisory lock
    Unlock(lock::LockArgs),
    /// Query which session (if any) holds a datastore's lock
    IsLocked(lock::LockArgs),
    /// Commit candidate into running, optionally as a confirmed commit
    Commit(commit::CommitArgs),
    /// Cancel a pending confirmed commit
    CancelCommit(commit::CancelCommitArgs),
    /// Close this session cleanly (releases its locks)
    CloseSession,
    /// Terminate another session, releasing its locks
    KillSession(session::KillSessionArgs),
    /// Subscribe to a notification stream and print events as they arrive
    CreateSubscription(session::CreateSubscriptionArgs),
    /// Change the daemon's runtime log level
    DebugLevel(debug::DebugLevelArgs),
    /// Dispatch a plugin-defined operation
    CustomRpc(custom_rpc::CustomRpcArgs),
    /// Manage the ncfd backend process
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e.downcast_ref::<exit_error::ExitError>().map_or(1, |c| c.code);
        eprintln!("Error: {}", format_error(&e));
        std::process::exit(code);
    }
}

/// Format an anyhow error, skipping a source chain that's already implied
/// by the top-level message (common with thiserror `#[from]` variants).
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();
    let chain_redundant = err.chain().skip(1).all(|cause| top.contains(&cause.to_string()));
    if chain_redundant {
        return top;
    }
    let mut buf = top;
    for cause in err.chain().skip(1) {
        buf.push_str(&format!("\n  caused by: {cause}"));
    }
    buf
}

async fn run() -> Result<()> {
    let matches = match Cli::command_with_styles().try_get_matches() {
        Ok(m) => m,
        Err(e) => e.exit(),
    };
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;
    let format = cli.output;

    let Some(command) = cli.command else {
        Cli::command_with_styles().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::GetConfig(args) => config::get_config(args, format).await,
        Commands::Get(args) => config::get(args, format).await,
        Commands::EditConfig(args) => config::edit_config(args).await,
        Commands::CopyConfig(args) => config::copy_config(args).await,
        Commands::DeleteConfig(args) => config::delete_config(args).await,
        Commands::Validate(args) => config::validate(args, format).await,
        Commands::DiscardChanges => config::discard_changes().await,
        Commands::Lock(args) => lock::lock(args).await,
        Commands::Unlock(args) => lock::unlock(args).await,
        Commands::IsLocked(args) => lock::is_locked(args, format).await,
        Commands::Commit(args) => commit::commit(args, format).await,
        Commands::CancelCommit(args) => commit::cancel_commit(args).await,
        Commands::CloseSession => session::close_session().await,
        Commands::KillSession(args) => session::kill_session(args).await,
        Commands::CreateSubscription(args) => session::create_subscription(args).await,
        Commands::DebugLevel(args) => debug::debug_level(args).await,
        Commands::CustomRpc(args) => custom_rpc::custom_rpc(args, format).await,
        Commands::Daemon(args) => daemon::daemon(args, format).await,
    }
}

impl Cli {
    fn command_with_styles() -> clap::Command {
        use clap::CommandFactory;
        <Cli as CommandFactory>::command().styles(color::styles())
    }
}
