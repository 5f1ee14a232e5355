// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured RPC error record (§6, §7).
//!
//! Errors are modeled as a tagged record with `(origin, kind, tag, message,
//! context?)`. A handler converts any internal error into this shape for its
//! caller; it never terminates the daemon. The two exceptions that do
//! terminate the process (a failsafe commit failure after a rollback
//! failure, and a detected internal-invariant bug) are raised directly by
//! the transaction engine, not surfaced through this type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which subsystem raised the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorOrigin {
    Datastore,
    Schema,
    Rpc,
    Plugin,
    System,
    Restconf,
    Ssl,
    Nghttp2,
}

/// `error-type` in the wire `rpc-error` element (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Transport,
    Rpc,
    Protocol,
    Application,
}

/// A structured error reply. `tag` follows the open vocabulary named in §6
/// (`lock-denied`, `missing-element`, `invalid-value`, `operation-failed`,
/// `malformed-message`, `operation-not-supported`, and plugin-defined tags).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub origin: ErrorOrigin,
    pub kind: ErrorKind,
    pub tag: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl std::error::Error for RpcError {}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tag, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({ctx})")?;
        }
        Ok(())
    }
}

impl RpcError {
    pub fn new(
        origin: ErrorOrigin,
        kind: ErrorKind,
        tag: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { origin, kind, tag: tag.into(), message: message.into(), context: None }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// `lock-denied`, carrying the current holder's session id in context.
    pub fn lock_denied(holder: crate::session::SessionId) -> Self {
        Self::new(
            ErrorOrigin::Rpc,
            ErrorKind::Application,
            "lock-denied",
            "Operation failed, lock is already held",
        )
        .with_context(format!("session-id={holder}"))
    }

    pub fn unknown_database(name: &str) -> Self {
        Self::new(
            ErrorOrigin::Datastore,
            ErrorKind::Application,
            "invalid-value",
            format!("Unknown database: {name}"),
        )
    }

    pub fn operation_not_supported(op: &str) -> Self {
        Self::new(
            ErrorOrigin::Rpc,
            ErrorKind::Protocol,
            "operation-not-supported",
            format!("Operation not supported: {op}"),
        )
    }

    /// `unlock` by a session that isn't the current holder (§4.2 "lock /
    /// unlock"): `lock-denied` with context `pid=<caller> piddb=<holder>`,
    /// distinct from `lock_denied`'s `session-id=` context used when a
    /// `lock` request itself is refused.
    pub fn unlock_denied(caller: crate::session::SessionId, holder: crate::session::SessionId) -> Self {
        Self::new(
            ErrorOrigin::Rpc,
            ErrorKind::Application,
            "lock-denied",
            "Operation failed, lock is not held by this session",
        )
        .with_context(format!("pid={caller} piddb={holder}"))
    }

    pub fn state_data_not_allowed(path: &str) -> Self {
        Self::new(
            ErrorOrigin::Schema,
            ErrorKind::Application,
            "invalid-value",
            "State data not allowed",
        )
        .with_context(path.to_string())
    }
}
