// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `commit` / `cancel-commit` — the confirmed-commit transaction RPCs.

use anyhow::Result;
use clap::Args;

use crate::client::{CommitResult, DaemonClient};
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct CommitArgs {
    /// Require a follow-up commit within the timeout, or roll back
    #[arg(long)]
    pub confirmed: bool,
    /// Seconds before an unconfirmed commit rolls back (default from
    /// `NCFD_CONFIRM_TIMEOUT_DEFAULT_SECS`, or 600)
    #[arg(long = "confirm-timeout")]
    pub confirm_timeout_secs: Option<u64>,
    /// Persist the confirming state across this session's disconnect,
    /// tagged with an id a later session can confirm or cancel by
    #[arg(long)]
    pub persist: Option<String>,
    /// Confirm or replace a persistent confirming commit tagged with
    /// this id, from a different session
    #[arg(long = "persist-id")]
    pub persist_id: Option<String>,
}

pub async fn commit(args: CommitArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action()?;
    let result = client
        .commit(args.confirmed, args.confirm_timeout_secs, args.persist, args.persist_id)
        .await?;

    match result {
        CommitResult::Plain => {
            let obj = serde_json::json!({ "confirming": false });
            format_or_json(format, &obj, || println!("committed"))
        }
        CommitResult::Confirmed(outcome) => {
            let obj = serde_json::json!({
                "confirming": outcome.confirming,
                "rollback": outcome.rollback.map(|r| r.0),
            });
            format_or_json(format, &obj, || {
                if outcome.confirming {
                    println!("commit pending confirmation");
                } else if let Some(report) = outcome.rollback {
                    println!("confirmed-commit rolled back (report: {:#05b})", report.0);
                } else {
                    println!("confirmed-commit made permanent");
                }
            })
        }
    }
}

#[derive(Args)]
pub struct CancelCommitArgs {
    /// Cancel a persistent confirming commit tagged with this id, from a
    /// different session
    #[arg(long = "persist-id")]
    pub persist_id: Option<String>,
}

pub async fn cancel_commit(args: CancelCommitArgs) -> Result<()> {
    let client = DaemonClient::for_action()?;
    client.cancel_commit(args.persist_id).await?;
    println!("cancelled confirming commit");
    Ok(())
}
