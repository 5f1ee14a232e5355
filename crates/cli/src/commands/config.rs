// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `get-config` / `get` / `edit-config` / `copy-config` / `delete-config` /
//! `validate` / `discard-changes` — the datastore-content RPCs.

use anyhow::{anyhow, Result};
use clap::Args;
use ncfd_core::Operation;
use serde_json::Value;

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct GetConfigArgs {
    /// Datastore to read (running, candidate, startup, ...)
    pub source: String,
    /// Subtree filter (an XPath-like selector string)
    #[arg(long)]
    pub filter: Option<String>,
}

pub async fn get_config(args: GetConfigArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let data = client.get_config(&args.source, args.filter.as_deref()).await?;
    print_data(&data, format)
}

#[derive(Args)]
pub struct GetArgs {
    /// Subtree filter (an XPath-like selector string)
    #[arg(long)]
    pub filter: Option<String>,
}

pub async fn get(args: GetArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let data = client.get(args.filter.as_deref()).await?;
    print_data(&data, format)
}

fn print_data(data: &Value, format: OutputFormat) -> Result<()> {
    format_or_json(format, data, || {
        println!("{}", serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string()));
    })
}

fn parse_operation(s: &str) -> Result<Operation, String> {
    match s {
        "merge" => Ok(Operation::Merge),
        "replace" => Ok(Operation::Replace),
        "create" => Ok(Operation::Create),
        "delete" => Ok(Operation::Delete),
        "remove" => Ok(Operation::Remove),
        "none" => Ok(Operation::None),
        other => Err(format!(
            "invalid operation '{other}' (expected merge, replace, create, delete, remove, or none)"
        )),
    }
}

#[derive(Args)]
pub struct EditConfigArgs {
    /// Datastore to mutate (almost always `candidate`)
    pub target: String,
    /// Default operation applied where a node carries none of its own
    #[arg(long, value_parser = parse_operation)]
    pub operation: Option<Operation>,
    /// Inline JSON payload
    #[arg(long, conflicts_with = "config_file")]
    pub config: Option<String>,
    /// Path to a file holding the JSON payload
    #[arg(long = "config-file", conflicts_with = "config")]
    pub config_file: Option<std::path::PathBuf>,
}

fn read_config_payload(args: &EditConfigArgs) -> Result<Value> {
    let raw = if let Some(inline) = &args.config {
        inline.clone()
    } else if let Some(path) = &args.config_file {
        std::fs::read_to_string(path)?
    } else {
        return Err(anyhow!("either --config or --config-file is required"));
    };
    Ok(serde_json::from_str(&raw)?)
}

pub async fn edit_config(args: EditConfigArgs) -> Result<()> {
    let config = read_config_payload(&args)?;
    let client = DaemonClient::for_action()?;
    client.edit_config(&args.target, args.operation, config).await?;
    println!("edit-config applied to {}", crate::color::header(&args.target));
    Ok(())
}

#[derive(Args)]
pub struct CopyConfigArgs {
    pub source: String,
    pub target: String,
}

pub async fn copy_config(args: CopyConfigArgs) -> Result<()> {
    let client = DaemonClient::for_action()?;
    client.copy_config(&args.source, &args.target).await?;
    println!("copied {} into {}", crate::color::header(&args.source), crate::color::header(&args.target));
    Ok(())
}

#[derive(Args)]
pub struct DeleteConfigArgs {
    pub target: String,
}

pub async fn delete_config(args: DeleteConfigArgs) -> Result<()> {
    let client = DaemonClient::for_action()?;
    client.delete_config(&args.target).await?;
    println!("deleted {}", crate::color::header(&args.target));
    Ok(())
}

#[derive(Args)]
pub struct ValidateArgs {
    pub source: String,
}

pub async fn validate(args: ValidateArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let (ok, violations) = client.validate(&args.source).await?;
    let obj = serde_json::json!({ "ok": ok, "violations": violations });
    format_or_json(format, &obj, || {
        if ok {
            println!("{} is valid", crate::color::header(&args.source));
        } else {
            println!("{} has {} violation(s):", crate::color::header(&args.source), violations.len());
            for v in &violations {
                println!("  - {v}");
            }
        }
    })?;
    if !ok {
        return Err(crate::exit_error::ExitError::new(1, "validation failed").into());
    }
    Ok(())
}

pub async fn discard_changes() -> Result<()> {
    let client = DaemonClient::for_action()?;
    client.discard_changes().await?;
    println!("discarded candidate changes");
    Ok(())
}
