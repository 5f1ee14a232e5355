// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification bus (§4.5, §6 "Notification events").
//!
//! Events are posted per named stream with a per-stream monotonic sequence
//! number. Publishing walks every subscriber whose filter matches and
//! pushes the event onto its connection task; a subscriber whose
//! connection has gone away (its receiver dropped) has the event dropped
//! and counted rather than affecting any other subscriber (§4.5
//! "backpressure").

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ncfd_core::{Clock, NotificationEvent};
use ncfd_wire::Response;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::session::SessionRegistry;

/// Per-stream sequence counters plus a running count of undelivered
/// (dropped) events, for diagnostics.
#[derive(Default)]
pub struct NotificationBus {
    sequences: Mutex<HashMap<String, AtomicU64>>,
    dropped: AtomicU64,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn next_seq(&self, stream: &str) -> u64 {
        let mut sequences = self.sequences.lock();
        let counter = sequences.entry(stream.to_string()).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Post `payload` to `stream` (optionally scoped under `path`), and
    /// deliver it to every session whose subscription matches. Returns the
    /// minted event (for callers that also want to log or persist it).
    pub fn publish<C: Clock>(
        &self,
        sessions: &SessionRegistry,
        clock: &C,
        stream: &str,
        path: Option<String>,
        payload: Value,
    ) -> NotificationEvent {
        let event = NotificationEvent {
            stream: stream.to_string(),
            seq: self.next_seq(stream),
            epoch_ms: clock.epoch_ms(),
            path: path.clone(),
            payload,
        };

        for subscriber in sessions.matching_subscribers(stream, path.as_deref()) {
            if subscriber.notify_tx.send(Response::Notification(event.clone())).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(session = %subscriber.id, stream, "notification dropped, session unwritable");
            }
        }

        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Transport;
    use ncfd_core::FakeClock;
    use serde_json::json;

    #[test]
    fn publish_assigns_increasing_sequence_numbers_per_stream() {
        let bus = NotificationBus::new();
        let sessions = SessionRegistry::new();
        let clock = FakeClock::new();

        let e1 = bus.publish(&sessions, &clock, "NETCONF", None, json!({"a": 1}));
        let e2 = bus.publish(&sessions, &clock, "NETCONF", None, json!({"a": 2}));
        let e3 = bus.publish(&sessions, &clock, "other", None, json!({"a": 3}));

        assert_eq!(e1.seq, 1);
        assert_eq!(e2.seq, 2);
        assert_eq!(e3.seq, 1);
    }

    #[test]
    fn matching_subscriber_receives_the_event() {
        let bus = NotificationBus::new();
        let mut sessions = SessionRegistry::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let id = sessions.create(Transport::Unix, None, tx);
        sessions.add_subscription(id, ncfd_core::Subscription::new(id, None, None));

        let clock = FakeClock::new();
        bus.publish(&sessions, &clock, "NETCONF", Some("/interfaces".to_string()), json!({"x": 1}));

        let received = rx.try_recv().expect("expected a pushed notification");
        match received {
            Response::Notification(evt) => assert_eq!(evt.path.as_deref(), Some("/interfaces")),
            _ => panic!("wrong response variant"),
        }
    }

    #[test]
    fn dropped_session_does_not_affect_the_drop_count_of_others() {
        let bus = NotificationBus::new();
        let mut sessions = SessionRegistry::new();

        let (tx1, rx1) = tokio::sync::mpsc::unbounded_channel();
        drop(rx1);
        let dead = sessions.create(Transport::Unix, None, tx1);
        sessions.add_subscription(dead, ncfd_core::Subscription::new(dead, None, None));

        let (tx2, mut rx2) = tokio::sync::mpsc::unbounded_channel();
        let alive = sessions.create(Transport::Unix, None, tx2);
        sessions.add_subscription(alive, ncfd_core::Subscription::new(alive, None, None));

        let clock = FakeClock::new();
        bus.publish(&sessions, &clock, "NETCONF", None, json!({"x": 1}));

        assert_eq!(bus.dropped_count(), 1);
        assert!(rx2.try_recv().is_ok());
    }
}
