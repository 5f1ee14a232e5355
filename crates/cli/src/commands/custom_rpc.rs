// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `custom-rpc` — dispatch an operation name the wire protocol doesn't
//! know about to the plugin surface (§4.2).

use anyhow::{anyhow, Result};
use clap::Args;
use ncfd_wire::Response;

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct CustomRpcArgs {
    /// Plugin-defined operation name
    pub operation: String,
    /// Inline JSON payload (default: `null`)
    #[arg(long)]
    pub payload: Option<String>,
}

pub async fn custom_rpc(args: CustomRpcArgs, format: OutputFormat) -> Result<()> {
    let payload = match args.payload {
        Some(raw) => serde_json::from_str(&raw)?,
        None => serde_json::Value::Null,
    };

    let client = DaemonClient::for_action()?;
    match client.custom_rpc(args.operation, payload).await? {
        Response::Ok => format_or_json(format, &serde_json::json!({"ok": true}), || println!("ok")),
        Response::Data(data) => format_or_json(format, &data, || {
            println!("{}", serde_json::to_string_pretty(&data).unwrap_or_default());
        }),
        Response::Error(e) => Err(anyhow!(e)),
        other => Err(anyhow!("unexpected response: {other:?}")),
    }
}
