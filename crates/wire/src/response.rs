// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC reply shapes (§3 "RPC message", §4.4 step 5, §6).

use ncfd_core::error::RpcError;
use ncfd_core::NotificationEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Hello { version: String },
    Pong,

    /// `<ok/>`.
    Ok,
    /// A `<data>`-wrapped subtree, or `Value::Null` for an empty selection
    /// (`get-config`/`get` return `<data/>` on an empty match).
    Data(Value),
    Error(RpcError),
    ValidateReport {
        ok: bool,
        violations: Vec<String>,
    },
    /// `islocked` reply: `Some(session_id)` or `None` for unlocked.
    LockStatus(Option<u32>),
    CommitOutcome(ConfirmedCommitOutcome),
    /// An asynchronously pushed notification-bus event (§4.5, §6). Unlike
    /// every other variant, this is not a reply to a request: the
    /// dispatcher writes it onto a subscribed session's connection
    /// whenever the notification bus has a matching event, interleaved
    /// between ordinary request/reply pairs.
    Notification(NotificationEvent),
}

/// Outcome of a `commit` RPC once the confirmed-commit machinery is
/// involved. A plain, non-confirmed commit just replies `Response::Ok`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfirmedCommitOutcome {
    pub confirming: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackReport>,
}

/// The error bitmask reported on a failed rollback (§4.4 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackReport(pub u8);

impl RollbackReport {
    pub const ROLLBACK_NOT_APPLIED: u8 = 0b001;
    pub const ROLLBACK_DB_NOT_DELETED: u8 = 0b010;
    pub const ROLLBACK_FAILSAFE_APPLIED: u8 = 0b100;

    pub fn success() -> Self {
        Self(0)
    }

    pub fn with(mut self, bit: u8) -> Self {
        self.0 |= bit;
        self
    }

    pub fn has(self, bit: u8) -> bool {
        self.0 & bit != 0
    }
}
