// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC request shapes (§4.2, §6 "Confirmed-commit request fields").

use ncfd_core::operation::Operation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// TCP handshake; the Unix socket transport skips straight to RPCs.
    Hello { auth_token: Option<String> },
    Ping,

    GetConfig {
        source: String,
        #[serde(default)]
        filter: Option<String>,
    },
    Get {
        #[serde(default)]
        filter: Option<String>,
    },
    EditConfig {
        target: String,
        #[serde(default)]
        default_operation: Option<Operation>,
        config: Value,
    },
    CopyConfig {
        source: String,
        target: String,
    },
    DeleteConfig {
        target: String,
    },
    Lock {
        target: String,
    },
    Unlock {
        target: String,
    },
    /// Read-only lock-holder query (§4.1 `islocked`); not itself named
    /// among §4.2's dispatched operations, but rounds out the datastore
    /// registry's exposed surface for CLI status displays and tests.
    IsLocked {
        target: String,
    },
    CloseSession,
    KillSession {
        session_id: u32,
    },
    Validate {
        source: String,
    },
    Commit {
        #[serde(default)]
        confirmed: bool,
        #[serde(default)]
        confirm_timeout_secs: Option<u64>,
        #[serde(default)]
        persist: Option<String>,
        #[serde(default)]
        persist_id: Option<String>,
    },
    DiscardChanges,
    CancelCommit {
        #[serde(default)]
        persist_id: Option<String>,
    },
    CreateSubscription {
        #[serde(default)]
        stream: Option<String>,
        #[serde(default)]
        filter: Option<String>,
    },
    Debug {
        level: u8,
    },
    /// An operation name the dispatch table does not recognize, offered to
    /// the plugin surface before being rejected (§4.2).
    CustomRpc {
        operation: String,
        #[serde(default)]
        payload: Value,
    },
}
