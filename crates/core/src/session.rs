// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identity.
//!
//! A session is created on accept of a client transport connection and lives
//! until the peer closes, the transport errors, or `kill-session` succeeds.
//! Session ids are monotonically assigned positive integers, never reused
//! within a process (§3 "Session").

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Unique, monotonically increasing identifier for a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct SessionId(u32);

impl SessionId {
    /// Mint the next session id. Ids start at 1; 0 is reserved to mean
    /// "no holder" for advisory datastore locks.
    pub fn next(counter: &AtomicU32) -> Self {
        Self(counter.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the peer that opened a session, when known (e.g. a
/// certificate subject, a RESTCONF username, or an SNMP community).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PeerIdentity(pub String);

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
