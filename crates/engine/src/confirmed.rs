// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/outcome shapes and the pure decision logic for the confirmed-
//! commit state machine (§4.4). The side-effecting orchestration (talking
//! to the datastore registry, the plugin registry, and the rollback
//! scheduler) lives on [`crate::Engine`]; this module only decides *what*
//! should happen given the current record and an incoming `commit` RPC.

use ncfd_core::{ConfirmedCommitRecord, SessionId};
use std::time::Duration;

/// The fields of a `commit` RPC relevant to the confirmed-commit machinery
/// (§6 "Confirmed-commit request fields").
#[derive(Debug, Clone)]
pub struct ConfirmedCommitRequest {
    pub session: SessionId,
    pub confirmed: bool,
    pub confirm_timeout: Option<Duration>,
    pub persist: Option<String>,
    pub persist_id: Option<String>,
}

/// What a `commit` RPC resolves to once the confirmed-commit record is
/// consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitDecision {
    /// A valid confirming commit: affirm and end the active sequence.
    ConfirmingCommit,
    /// Either no sequence is active, or the request doesn't affirm the
    /// active one — proceed as an ordinary commit (§4.4: "An invalid
    /// confirming commit while a confirmed-commit is active proceeds as a
    /// normal (non-confirming) commit, leaving the sequence active").
    NormalCommit,
    /// `<confirmed/>` was set: begin or refresh an active sequence.
    EnterOrRefreshSequence,
}

/// Pure decision: does `req` affirm the active sequence, start/refresh one,
/// or fall through to a plain commit?
pub fn decide(record: &ConfirmedCommitRecord, req: &ConfirmedCommitRequest) -> CommitDecision {
    if req.confirmed {
        return CommitDecision::EnterOrRefreshSequence;
    }
    if record.is_confirming_commit(req.session, req.persist_id.as_deref()) {
        CommitDecision::ConfirmingCommit
    } else {
        CommitDecision::NormalCommit
    }
}

/// Reply shape for a `commit` RPC once confirmed-commit bookkeeping is
/// folded in; translated onto the wire at the dispatcher boundary (§10.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedCommitOutcome {
    pub confirming: bool,
    pub rollback: Option<RollbackReport>,
}

impl ConfirmedCommitOutcome {
    pub fn plain() -> Self {
        Self { confirming: false, rollback: None }
    }

    pub fn confirming() -> Self {
        Self { confirming: true, rollback: None }
    }
}

/// The error bitmask reported on a failed rollback (§4.4 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

    pub fn is_success(self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncfd_core::TimerId;
    use std::sync::atomic::AtomicU32;

    fn sid(counter: &AtomicU32) -> SessionId {
        SessionId::next(counter)
    }

    fn req(session: SessionId, confirmed: bool, persist_id: Option<&str>) -> ConfirmedCommitRequest {
        ConfirmedCommitRequest {
            session,
            confirmed,
            confirm_timeout: None,
            persist: None,
            persist_id: persist_id.map(str::to_string),
        }
    }

    #[test]
    fn confirmed_flag_always_enters_or_refreshes() {
        let record = ConfirmedCommitRecord::inactive();
        let counter = AtomicU32::new(0);
        let s = sid(&counter);
        assert_eq!(decide(&record, &req(s, true, None)), CommitDecision::EnterOrRefreshSequence);
    }

    #[test]
    fn ephemeral_owner_without_persist_id_confirms() {
        let mut record = ConfirmedCommitRecord::inactive();
        let counter = AtomicU32::new(0);
        let owner = sid(&counter);
        record.enter_ephemeral(owner, TimerId::next());
        assert_eq!(decide(&record, &req(owner, false, None)), CommitDecision::ConfirmingCommit);
    }

    #[test]
    fn ephemeral_owner_with_persist_id_is_a_normal_commit() {
        let mut record = ConfirmedCommitRecord::inactive();
        let counter = AtomicU32::new(0);
        let owner = sid(&counter);
        record.enter_ephemeral(owner, TimerId::next());
        assert_eq!(decide(&record, &req(owner, false, Some("X"))), CommitDecision::NormalCommit);
    }

    #[test]
    fn persistent_matching_persist_id_from_other_session_confirms() {
        let mut record = ConfirmedCommitRecord::inactive();
        record.enter_persistent("X".to_string(), TimerId::next());
        let counter = AtomicU32::new(0);
        let other = sid(&counter);
        assert_eq!(decide(&record, &req(other, false, Some("X"))), CommitDecision::ConfirmingCommit);
    }

    #[test]
    fn inactive_record_is_always_a_normal_commit() {
        let record = ConfirmedCommitRecord::inactive();
        let counter = AtomicU32::new(0);
        let s = sid(&counter);
        assert_eq!(decide(&record, &req(s, false, None)), CommitDecision::NormalCommit);
    }
}
