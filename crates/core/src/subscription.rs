// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification subscriptions and events (§3 "Subscription", §4.5, §6).

use crate::session::SessionId;
use serde::{Deserialize, Serialize};

/// A `(session, stream, filter)` triple; lifetime bounded by the session.
///
/// Only the path-expression filter kind is accepted (`create-subscription`,
/// §4.2); anything else is refused at the RPC boundary before a
/// `Subscription` is ever constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub session: SessionId,
    pub stream: String,
    pub filter: Option<String>,
}

impl Subscription {
    pub const DEFAULT_STREAM: &'static str = "NETCONF";

    pub fn new(session: SessionId, stream: Option<String>, filter: Option<String>) -> Self {
        Self { session, stream: stream.unwrap_or_else(|| Self::DEFAULT_STREAM.to_string()), filter }
    }

    /// Whether `path` (an event's notification path, if any) is selected by
    /// this subscription's filter. An absent filter matches everything.
    pub fn matches(&self, path: Option<&str>) -> bool {
        match (&self.filter, path) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(filter), Some(path)) => path.starts_with(filter.as_str()),
        }
    }
}

/// An event posted to a stream (§6 "Notification events").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub stream: String,
    /// Monotonic sequence number within the stream.
    pub seq: u64,
    pub epoch_ms: u64,
    pub path: Option<String>,
    pub payload: serde_json::Value,
}
