// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The concrete [`RollbackScheduler`] the daemon's `tokio` runtime
//! implements (§9 REDESIGN FLAGS: "a timer handle returned by the event
//! loop and stored directly"). `ncfd-engine` only sees the trait; this is
//! the one real implementation, driven by `tokio::time::sleep`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ncfd_core::TimerId;
use ncfd_engine::RollbackScheduler;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

/// Schedules rollback timers as detached `tokio` tasks that report back
/// onto a single channel the main loop drains. Cancellation races a timer
/// that has already begun firing (§5 "Cancellation"): a cancelled id is
/// recorded and checked right before the fired-notification would be
/// sent, so a timer that fires and is cancelled in the same instant
/// resolves in favor of cancellation.
pub struct TokioRollbackScheduler {
    fired_tx: UnboundedSender<TimerId>,
    cancelled: Arc<Mutex<HashSet<TimerId>>>,
}

impl TokioRollbackScheduler {
    pub fn new(fired_tx: UnboundedSender<TimerId>) -> Self {
        Self { fired_tx, cancelled: Arc::new(Mutex::new(HashSet::new())) }
    }
}

impl RollbackScheduler for TokioRollbackScheduler {
    fn schedule(&self, after: Duration) -> TimerId {
        let id = TimerId::next();
        let tx = self.fired_tx.clone();
        let cancelled = self.cancelled.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if !cancelled.lock().remove(&id) {
                let _ = tx.send(id);
            }
        });
        id
    }

    fn cancel(&self, timer: TimerId) {
        self.cancelled.lock().insert(timer);
    }
}
