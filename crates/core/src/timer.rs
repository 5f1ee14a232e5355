// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer handle type for the confirmed-commit rollback timer.
//!
//! The original backend stored a function-pointer + opaque argument pair on
//! the confirmed-commit record so the scheduled callback could be cancelled
//! by identity. Here the event loop hands back an opaque [`TimerId`] when a
//! timer is scheduled; the owner stores it and presents it back to cancel.
//! `TimerId` carries no meaning of its own beyond identity and ordering.

use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle to a scheduled one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct TimerId(u64);

impl TimerId {
    /// Mint a new, never-repeating timer id within this process.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}
