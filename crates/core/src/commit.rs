// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide confirmed-commit record (§3 "Confirmed-commit state",
//! §4.4).
//!
//! This module holds only the data shape and its invariants; the
//! transitions themselves (creating/deleting the `rollback` datastore,
//! scheduling timers, running the commit pipeline) belong to `ncfd-engine`,
//! which is the only writer of a `ConfirmedCommitRecord`.

use crate::session::SessionId;
use crate::timer::TimerId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default `confirm-timeout` when a request omits it (§6).
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmedCommitState {
    Inactive,
    Ephemeral,
    Persistent,
    Rollback,
}

/// The single process-wide confirmed-commit record.
///
/// Invariants (§3):
/// - `state == Inactive` iff `timer` is `None` iff no `rollback` datastore
///   exists (save for the window during crash recovery).
/// - `state == Ephemeral` implies `owner` is `Some` and names a live
///   session.
/// - `state == Persistent` implies `persist_id` is `Some` and non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmedCommitRecord {
    state: ConfirmedCommitStateOrInactive,
    owner: Option<SessionId>,
    persist_id: Option<String>,
    #[serde(skip)]
    timer: Option<TimerId>,
}

/// Serde-friendly wrapper so `Default` can be derived without hand-rolling
/// `Default` for `ConfirmedCommitState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct ConfirmedCommitStateOrInactive(ConfirmedCommitState);

impl Default for ConfirmedCommitStateOrInactive {
    fn default() -> Self {
        Self(ConfirmedCommitState::Inactive)
    }
}

impl ConfirmedCommitRecord {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConfirmedCommitState {
        self.state.0
    }

    pub fn owner(&self) -> Option<SessionId> {
        self.owner
    }

    pub fn persist_id(&self) -> Option<&str> {
        self.persist_id.as_deref()
    }

    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state.0, ConfirmedCommitState::Inactive)
    }

    /// Enter `Ephemeral`, owned by `session`, with a freshly scheduled timer.
    pub fn enter_ephemeral(&mut self, session: SessionId, timer: TimerId) {
        self.state = ConfirmedCommitStateOrInactive(ConfirmedCommitState::Ephemeral);
        self.owner = Some(session);
        self.persist_id = None;
        self.timer = Some(timer);
    }

    /// Enter or refresh `Persistent` with `persist_id`, replacing the timer.
    pub fn enter_persistent(&mut self, persist_id: String, timer: TimerId) {
        self.state = ConfirmedCommitStateOrInactive(ConfirmedCommitState::Persistent);
        self.owner = None;
        self.persist_id = Some(persist_id);
        self.timer = Some(timer);
    }

    /// Refresh the timer handle of an already-active sequence without
    /// otherwise changing state (an overlapping confirmed-commit, §4.4).
    pub fn refresh_timer(&mut self, timer: TimerId) {
        self.timer = Some(timer);
    }

    pub fn enter_rollback(&mut self) {
        self.state = ConfirmedCommitStateOrInactive(ConfirmedCommitState::Rollback);
        self.timer = None;
    }

    /// Return to `Inactive`, clearing owner/persist-id/timer.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether `commit` without `<confirmed/>` from `session` (carrying
    /// `persist_id_in_request`, if any) is the confirming commit for the
    /// active sequence (§4.4 "Confirming commit").
    pub fn is_confirming_commit(
        &self,
        session: SessionId,
        persist_id_in_request: Option<&str>,
    ) -> bool {
        match self.state.0 {
            ConfirmedCommitState::Ephemeral => {
                self.owner == Some(session) && persist_id_in_request.is_none()
            }
            ConfirmedCommitState::Persistent => {
                matches!((self.persist_id.as_deref(), persist_id_in_request), (Some(a), Some(b)) if a == b)
            }
            ConfirmedCommitState::Inactive | ConfirmedCommitState::Rollback => false,
        }
    }
}
