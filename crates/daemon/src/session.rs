// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session registry (§4.5, §9 REDESIGN FLAGS).
//!
//! The source keeps sessions in an intrusive doubly-linked list with
//! back-pointers from subscription to session. Here sessions live in an
//! owned map keyed by [`SessionId`], and a subscription only ever carries
//! the id of the session that created it — looked back up through this
//! registry, never held as a reference across an await point.

use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::time::Instant;

use ncfd_core::{PeerIdentity, SessionId, Subscription};
use tokio::sync::mpsc::UnboundedSender;

use ncfd_wire::Response;

/// The transport a session arrived on, for auth/trust decisions (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// The local Unix socket — trusted, no auth handshake required.
    Unix,
    /// A remote TCP connection — requires `Hello { auth_token }` to match.
    Tcp,
}

/// A live client session: its identity, its subscriptions, and a channel
/// the notification bus and dispatcher use to push asynchronous replies
/// (notifications) onto its connection without blocking on the session's
/// own request/reply round-trip (§4.5).
pub struct SessionHandle {
    pub id: SessionId,
    pub peer: Option<PeerIdentity>,
    pub transport: Transport,
    pub created_at: Instant,
    pub subscriptions: Vec<Subscription>,
    /// Pushes a `Response::Notification` onto this session's connection
    /// task, which interleaves it with ordinary request/reply traffic.
    pub notify_tx: UnboundedSender<Response>,
}

/// Owned collection of live sessions, indexed by stable id (§9 REDESIGN
/// FLAGS: no intrusive list, no raw pointers — sessions are referenced by
/// id everywhere else in the daemon).
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, SessionHandle>,
    counter: AtomicU32,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a new session on connection accept (§3
    /// "Session" lifecycle).
    pub fn create(
        &mut self,
        transport: Transport,
        peer: Option<PeerIdentity>,
        notify_tx: UnboundedSender<Response>,
    ) -> SessionId {
        let id = SessionId::next(&self.counter);
        self.sessions.insert(
            id,
            SessionHandle {
                id,
                peer,
                transport,
                created_at: Instant::now(),
                subscriptions: Vec::new(),
                notify_tx,
            },
        );
        id
    }

    pub fn get(&self, id: SessionId) -> Option<&SessionHandle> {
        self.sessions.get(&id)
    }

    pub fn exists(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Destroy a session, removing it and its subscriptions from the
    /// registry. Lock release and confirmed-commit ownership are the
    /// engine's responsibility (`Engine::on_session_destroyed`); this just
    /// drops the bookkeeping entry (§5 "Resource release").
    pub fn destroy(&mut self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.remove(&id)
    }

    pub fn add_subscription(&mut self, id: SessionId, subscription: Subscription) {
        if let Some(handle) = self.sessions.get_mut(&id) {
            handle.subscriptions.push(subscription);
        }
    }

    /// Every session with at least one subscription matching `stream` and
    /// `path`, for the notification bus to walk (§4.5).
    pub fn matching_subscribers(&self, stream: &str, path: Option<&str>) -> Vec<&SessionHandle> {
        self.sessions
            .values()
            .filter(|handle| {
                handle.subscriptions.iter().any(|sub| sub.stream == stream && sub.matches(path))
            })
            .collect()
    }
}
