// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The rollback timer, re-architected as a handle returned by the event
//! loop and stored directly on the confirmed-commit record (§9 REDESIGN
//! FLAGS), rather than a function-pointer + opaque argument pair.
//!
//! The engine never drives an event loop itself: `ncfd-daemon` owns the
//! `tokio` runtime and implements this trait, handing timer ids back to
//! [`crate::Engine::on_timer_fired`] when a scheduled rollback timer
//! elapses.

use ncfd_core::TimerId;
use std::time::Duration;

/// Schedules and cancels the single one-shot rollback timer a confirmed-
/// commit sequence may have outstanding at any time.
pub trait RollbackScheduler: Send + Sync {
    /// Schedule a new timer to fire `after` from now, returning its handle.
    fn schedule(&self, after: Duration) -> TimerId;

    /// Cancel a previously scheduled timer. A timer that has already begun
    /// firing cannot be cancelled (§5 "Cancellation"); callers tolerate a
    /// no-op cancel of an id that is racing to fire.
    fn cancel(&self, timer: TimerId);
}
