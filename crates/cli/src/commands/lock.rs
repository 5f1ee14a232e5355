// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lock` / `unlock` / `is-locked` — the advisory datastore lock RPCs.

use anyhow::Result;
use clap::Args;

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct LockArgs {
    pub target: String,
}

pub async fn lock(args: LockArgs) -> Result<()> {
    let client = DaemonClient::for_action()?;
    client.lock(&args.target).await?;
    println!("locked {}", crate::color::header(&args.target));
    Ok(())
}

pub async fn unlock(args: LockArgs) -> Result<()> {
    let client = DaemonClient::for_action()?;
    client.unlock(&args.target).await?;
    println!("unlocked {}", crate::color::header(&args.target));
    Ok(())
}

pub async fn is_locked(args: LockArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let holder = client.is_locked(&args.target).await?;
    let obj = serde_json::json!({ "target": args.target, "holder": holder });
    format_or_json(format, &obj, || match holder {
        Some(session_id) => println!(
            "{} is locked by session {}",
            crate::color::header(&args.target),
            crate::color::context(&session_id.to_string())
        ),
        None => println!("{} is unlocked", crate::color::header(&args.target)),
    })
}
