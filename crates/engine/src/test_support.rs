// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A synchronous, in-memory [`RollbackScheduler`] for engine tests: no
//! timer actually fires on its own, so tests drive expiry explicitly via
//! [`Engine::on_timer_fired`](crate::Engine::on_timer_fired).

use crate::scheduler::RollbackScheduler;
use ncfd_core::TimerId;
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct FakeScheduler {
    scheduled: Mutex<Vec<(TimerId, Duration)>>,
    cancelled: Mutex<Vec<TimerId>>,
}

impl FakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled_len(&self) -> usize {
        self.scheduled.lock().len()
    }

    pub fn was_cancelled(&self, timer: TimerId) -> bool {
        self.cancelled.lock().contains(&timer)
    }

    pub fn last_timeout(&self) -> Option<Duration> {
        self.scheduled.lock().last().map(|(_, d)| *d)
    }
}

impl RollbackScheduler for FakeScheduler {
    fn schedule(&self, after: Duration) -> TimerId {
        let id = TimerId::next();
        self.scheduled.lock().push((id, after));
        id
    }

    fn cancel(&self, timer: TimerId) {
        self.cancelled.lock().push(timer);
    }
}
