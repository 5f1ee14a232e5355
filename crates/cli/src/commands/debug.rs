// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `debug-level` — runtime log-level change (§11 "Debug-level RPC").

use anyhow::Result;
use clap::Args;

use crate::client::DaemonClient;

#[derive(Args)]
pub struct DebugLevelArgs {
    /// 0=error, 1=warn, 2=info, 3=debug, 4+=trace
    pub level: u8,
}

pub async fn debug_level(args: DebugLevelArgs) -> Result<()> {
    let client = DaemonClient::for_action()?;
    client.debug_level(args.level).await?;
    println!("log level set to {}", args.level);
    Ok(())
}
