// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `close-session` / `kill-session` / `create-subscription` — session
//! lifecycle and notification subscription RPCs.

use anyhow::Result;
use clap::Args;

use crate::client::DaemonClient;

pub async fn close_session() -> Result<()> {
    let client = DaemonClient::for_action()?;
    client.close_session().await?;
    println!("session closed");
    Ok(())
}

#[derive(Args)]
pub struct KillSessionArgs {
    pub session_id: u32,
}

pub async fn kill_session(args: KillSessionArgs) -> Result<()> {
    let client = DaemonClient::for_action()?;
    client.kill_session(args.session_id).await?;
    println!("killed session {}", crate::color::header(&args.session_id.to_string()));
    Ok(())
}

#[derive(Args)]
pub struct CreateSubscriptionArgs {
    /// Notification stream to subscribe to (default: NETCONF)
    #[arg(long)]
    pub stream: Option<String>,
    /// Subtree filter restricting which events are delivered
    #[arg(long)]
    pub filter: Option<String>,
}

pub async fn create_subscription(args: CreateSubscriptionArgs) -> Result<()> {
    let client = DaemonClient::for_action()?;
    println!("subscribed; press Ctrl-C to stop");
    client
        .subscribe(
            args.stream,
            args.filter,
            |event| println!("{}", serde_json::to_string_pretty(&event).unwrap_or_default()),
            async {
                let _ = tokio::signal::ctrl_c().await;
            },
        )
        .await?;
    Ok(())
}
