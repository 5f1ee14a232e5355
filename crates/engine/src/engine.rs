// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transaction engine (§4.3, §4.4): the single owner of the datastore
//! registry, the schema registry, the plugin registry, and the confirmed-
//! commit record. The RPC dispatcher in `ncfd-daemon` is the only caller.

use crate::commit::run_commit_pipeline;
use crate::confirmed::{decide, CommitDecision, ConfirmedCommitOutcome, ConfirmedCommitRequest, RollbackReport};
use crate::error::EngineError;
use crate::scheduler::RollbackScheduler;
use crate::validate::{validate_tree, ValidateReport};
use ncfd_core::{ConfirmedCommitRecord, ConfirmedCommitState, DatastoreName, Operation, SessionId, TimerId};
use ncfd_plugin::PluginRegistry;
use ncfd_schema::SchemaRegistry;
use ncfd_storage::DatastoreRegistry;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Ties the datastore registry, schema registry, plugin registry, and
/// confirmed-commit record together into the operations §4.1-§4.4
/// describe. Holds no transport- or session-registry state of its own;
/// `ncfd-daemon` is responsible for mapping wire requests onto these
/// calls and session identities onto `SessionId`.
pub struct Engine {
    pub(crate) storage: DatastoreRegistry,
    pub(crate) schema: SchemaRegistry,
    pub(crate) plugins: PluginRegistry,
    pub(crate) confirmed: ConfirmedCommitRecord,
    pub(crate) scheduler: Arc<dyn RollbackScheduler>,
}

impl Engine {
    pub fn new(
        storage: DatastoreRegistry,
        schema: SchemaRegistry,
        plugins: PluginRegistry,
        scheduler: Arc<dyn RollbackScheduler>,
    ) -> Self {
        Self { storage, schema, plugins, confirmed: ConfirmedCommitRecord::inactive(), scheduler }
    }

    pub fn bootstrap(schema: SchemaRegistry, plugins: PluginRegistry, scheduler: Arc<dyn RollbackScheduler>) -> Self {
        Self::new(DatastoreRegistry::bootstrap(), schema, plugins, scheduler)
    }

    pub fn confirmed_state(&self) -> ConfirmedCommitState {
        self.confirmed.state()
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    // -- §4.1 passthroughs -------------------------------------------------

    pub fn exists(&self, name: &str) -> bool {
        self.storage.exists(name)
    }

    pub fn validate_name(&self, name: &str) -> Result<(), EngineError> {
        self.storage.validate_name(name).map_err(EngineError::from)
    }

    pub fn get_config(&self, name: &str, path: &str) -> Result<Value, EngineError> {
        Ok(self.storage.get(name, path)?)
    }

    /// `get` (§4.2): always reads `running`, then invokes the plugin
    /// state-data hook to augment the selected subtree.
    pub async fn get(&self, path: &str) -> Result<Value, EngineError> {
        let mut subtree = self.storage.get(DatastoreName::RUNNING, path)?;
        self.plugins.statedata(path, &mut subtree).await?;
        Ok(subtree)
    }

    /// `edit-config` (§4.2): schema-state-only rejection happens before
    /// the mutating `put`, so a rejected edit leaves `target` untouched.
    pub fn edit_config(
        &mut self,
        target: &str,
        caller: SessionId,
        operation: Operation,
        mut payload: Value,
    ) -> Result<(), EngineError> {
        self.check_not_locked_by_other(target, caller)?;
        let report = validate_tree(&self.schema, &payload);
        if !report.ok {
            return Err(EngineError::Invalid(report.violations.join("; ")));
        }
        self.schema.canonicalize("", &mut payload);
        self.storage.put(target, operation, payload)?;
        Ok(())
    }

    /// `copy-config` (§4.2): `target` must not be locked by another
    /// session (§5 "the datastore lock is... mandatory with respect to
    /// ... copy-config (as target)").
    pub fn copy_config(&mut self, src: &str, dst: &str, caller: SessionId) -> Result<(), EngineError> {
        self.check_not_locked_by_other(dst, caller)?;
        Ok(self.storage.copy(src, dst)?)
    }

    /// `delete-config` (§4.2): `target` must not be `running` and must not
    /// be locked by another session (§5 "mandatory with respect to ...
    /// delete-config").
    pub fn delete_config(&mut self, target: &str, caller: SessionId) -> Result<(), EngineError> {
        if target == DatastoreName::RUNNING {
            return Err(EngineError::Invalid("running may not be deleted".to_string()));
        }
        self.check_not_locked_by_other(target, caller)?;
        Ok(self.storage.delete(target)?)
    }

    /// Shared §5 guard: fail with `LockDenied` if `name` is held by a
    /// session other than `caller`. An absent lock, or a lock held by the
    /// caller itself, is not an error.
    fn check_not_locked_by_other(&self, name: &str, caller: SessionId) -> Result<(), EngineError> {
        if let Some(holder) = self.storage.islocked(name) {
            if holder != caller {
                return Err(EngineError::Storage(ncfd_storage::StorageError::LockDenied(holder)));
            }
        }
        Ok(())
    }

    pub fn lock(&mut self, name: &str, holder: SessionId) -> Result<(), EngineError> {
        Ok(self.storage.lock(name, holder)?)
    }

    pub fn unlock(&mut self, name: &str, holder: SessionId) -> Result<(), EngineError> {
        Ok(self.storage.unlock(name, holder)?)
    }

    pub fn islocked(&self, name: &str) -> Option<SessionId> {
        self.storage.islocked(name)
    }

    /// Session destruction and `kill-session` (§3, §4.2): release every
    /// lock the session held, and if it owned the active ephemeral
    /// confirmed-commit, roll it back immediately.
    pub async fn on_session_destroyed(&mut self, session: SessionId) -> Option<RollbackReport> {
        self.storage.unlock_all(session);
        if self.confirmed.state() == ConfirmedCommitState::Ephemeral && self.confirmed.owner() == Some(session) {
            if let Some(timer) = self.confirmed.timer() {
                self.scheduler.cancel(timer);
            }
            match self.do_rollback().await {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(error = %e, "rollback on session destruction failed");
                    None
                }
            }
        } else {
            None
        }
    }

    /// `close-session` (§4.2, §9 decision): releases every lock the
    /// session holds and nothing else. Distinct from `kill-session`/
    /// connection teardown, which also tears down the session itself and
    /// rolls back an owned ephemeral confirmed-commit sequence.
    pub fn close_session(&mut self, session: SessionId) {
        self.storage.unlock_all(session);
    }

    // -- §4.3 validate / commit / discard -----------------------------------

    pub fn validate(&self, name: &str) -> Result<ValidateReport, EngineError> {
        self.validate_name(name)?;
        let content = self.storage.content(name)?;
        Ok(validate_tree(&self.schema, content))
    }

    pub fn discard_changes(&mut self) -> Result<(), EngineError> {
        Ok(self.storage.copy(DatastoreName::RUNNING, DatastoreName::CANDIDATE)?)
    }

    /// `commit` (§4.3, §4.4). `candidate_src` is almost always `candidate`,
    /// but the rollback and crash-recovery paths reuse this same pipeline
    /// against `rollback` and `failsafe` (§4.4 steps 2 and 4).
    pub async fn commit(
        &mut self,
        candidate_src: &str,
        req: ConfirmedCommitRequest,
    ) -> Result<ConfirmedCommitOutcome, EngineError> {
        self.check_not_locked_by_other(candidate_src, req.session)?;
        let decision = decide(&self.confirmed, &req);

        if matches!(decision, CommitDecision::EnterOrRefreshSequence) && !self.storage.exists(DatastoreName::ROLLBACK) {
            self.storage.create(DatastoreName::ROLLBACK)?;
            self.storage.copy(DatastoreName::RUNNING, DatastoreName::ROLLBACK)?;
            info!("rollback datastore seeded from running at start of confirmed-commit sequence");
        }

        run_commit_pipeline(&mut self.storage, &self.schema, &self.plugins, candidate_src).await?;

        match decision {
            CommitDecision::EnterOrRefreshSequence => {
                let timeout = req.confirm_timeout.unwrap_or(ncfd_core::commit::DEFAULT_CONFIRM_TIMEOUT);
                if let Some(old_timer) = self.confirmed.timer() {
                    self.scheduler.cancel(old_timer);
                }
                let timer = self.scheduler.schedule(timeout);
                match req.persist {
                    Some(tag) => self.confirmed.enter_persistent(tag, timer),
                    None if self.confirmed.state() == ConfirmedCommitState::Persistent => {
                        self.confirmed.refresh_timer(timer)
                    }
                    None => self.confirmed.enter_ephemeral(req.session, timer),
                }
                Ok(ConfirmedCommitOutcome::plain())
            }
            CommitDecision::ConfirmingCommit => {
                if let Some(timer) = self.confirmed.timer() {
                    self.scheduler.cancel(timer);
                }
                self.storage.remove(DatastoreName::ROLLBACK)?;
                self.confirmed.reset();
                Ok(ConfirmedCommitOutcome::confirming())
            }
            CommitDecision::NormalCommit => Ok(ConfirmedCommitOutcome::plain()),
        }
    }

    /// `cancel-commit` (§4.2, §4.4): only valid while a sequence is
    /// active, and a persistent sequence requires a matching `persist-id`.
    pub async fn cancel_commit(&mut self, persist_id: Option<&str>) -> Result<RollbackReport, EngineError> {
        match self.confirmed.state() {
            ConfirmedCommitState::Inactive | ConfirmedCommitState::Rollback => {
                Err(EngineError::NoConfirmedCommitInProgress)
            }
            ConfirmedCommitState::Ephemeral => {
                if persist_id.is_some() {
                    return Err(EngineError::NotPersistent);
                }
                if let Some(timer) = self.confirmed.timer() {
                    self.scheduler.cancel(timer);
                }
                self.do_rollback().await
            }
            ConfirmedCommitState::Persistent => {
                match persist_id {
                    None => Err(EngineError::PersistIdRequired),
                    Some(given) if Some(given) == self.confirmed.persist_id() => {
                        if let Some(timer) = self.confirmed.timer() {
                            self.scheduler.cancel(timer);
                        }
                        self.do_rollback().await
                    }
                    Some(_) => Err(EngineError::PersistIdRequired),
                }
            }
        }
    }

    /// The rollback timer elapsing (§4.4 "Rollback", §5 "Cancellation").
    /// A stale or already-resolved timer id is a silent no-op: whichever
    /// of a confirming-commit and a timer expiry reaches this boundary
    /// first wins.
    pub async fn on_timer_fired(&mut self, timer_id: TimerId) -> Option<RollbackReport> {
        if self.confirmed.timer() != Some(timer_id) {
            return None;
        }
        match self.do_rollback().await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "rollback on timer expiry failed");
                None
            }
        }
    }

    /// §4.4 "Rollback" procedure, steps 1-5. Assumes `rollback` exists and
    /// the caller has already cancelled any outstanding timer.
    async fn do_rollback(&mut self) -> Result<RollbackReport, EngineError> {
        self.confirmed.enter_rollback();
        match run_commit_pipeline(&mut self.storage, &self.schema, &self.plugins, DatastoreName::ROLLBACK).await {
            Ok(_) => {
                self.storage.remove(DatastoreName::ROLLBACK)?;
                self.confirmed.reset();
                info!("rollback applied, confirmed-commit sequence ended");
                Ok(RollbackReport::success())
            }
            Err(e) => {
                warn!(error = %e, "rollback commit failed, setting rollback aside");
                let mut report = RollbackReport::success().with(RollbackReport::ROLLBACK_NOT_APPLIED);
                if self.storage.rename(DatastoreName::ROLLBACK, "rollback.error").is_err() {
                    report = report.with(RollbackReport::ROLLBACK_DB_NOT_DELETED);
                }
                match run_commit_pipeline(&mut self.storage, &self.schema, &self.plugins, DatastoreName::FAILSAFE).await
                {
                    Ok(_) => {
                        report = report.with(RollbackReport::ROLLBACK_FAILSAFE_APPLIED);
                        self.confirmed.reset();
                    }
                    Err(failsafe_err) => {
                        warn!(error = %failsafe_err, "failsafe commit failed after rollback failure, terminating");
                        self.raise_terminating_signal();
                    }
                }
                Ok(report)
            }
        }
    }

    /// §6 "Process signals": the rollback path raises `SIGINT` to abort
    /// the daemon after a catastrophic failsafe failure. Unconditionally
    /// best-effort: if raising the signal itself fails there is nothing
    /// further this process can do.
    #[cfg(unix)]
    fn raise_terminating_signal(&self) {
        use nix::sys::signal::{raise, Signal};
        if let Err(e) = raise(Signal::SIGINT) {
            warn!(error = %e, "failed to raise terminating signal after failsafe failure");
        }
    }

    #[cfg(not(unix))]
    fn raise_terminating_signal(&self) {
        warn!("failsafe commit failed after rollback failure; no terminating signal on this platform");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeScheduler;
    use ncfd_core::test_support::fresh_session_id;
    use serde_json::json;
    use std::time::Duration;

    fn engine() -> (Engine, Arc<FakeScheduler>) {
        let scheduler = Arc::new(FakeScheduler::new());
        let engine = Engine::bootstrap(SchemaRegistry::empty(), PluginRegistry::new(), scheduler.clone());
        (engine, scheduler)
    }

    fn confirmed_req(session: SessionId, confirmed: bool, persist: Option<&str>, persist_id: Option<&str>) -> ConfirmedCommitRequest {
        ConfirmedCommitRequest {
            session,
            confirmed,
            confirm_timeout: Some(Duration::from_secs(60)),
            persist: persist.map(str::to_string),
            persist_id: persist_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn plain_commit_installs_candidate_without_touching_confirmed_state() {
        let (mut e, _sched) = engine();
        let s = fresh_session_id();
        e.edit_config("candidate", s, Operation::Merge, json!({"x": 1})).unwrap();
        let outcome = e.commit("candidate", confirmed_req(s, false, None, None)).await.unwrap();
        assert!(!outcome.confirming);
        assert_eq!(e.confirmed_state(), ConfirmedCommitState::Inactive);
        assert_eq!(e.get_config("running", "/").unwrap(), json!({"x": 1}));
        assert!(!e.exists("rollback"));
    }

    #[tokio::test]
    async fn confirmed_commit_seeds_rollback_and_enters_ephemeral() {
        let (mut e, sched) = engine();
        let s = fresh_session_id();
        e.edit_config("candidate", s, Operation::Merge, json!({"x": 1})).unwrap();
        e.commit("candidate", confirmed_req(s, true, None, None)).await.unwrap();

        assert_eq!(e.confirmed_state(), ConfirmedCommitState::Ephemeral);
        assert!(e.exists("rollback"));
        assert_eq!(sched.scheduled_len(), 1);
    }

    #[tokio::test]
    async fn confirming_commit_from_owner_deletes_rollback_and_returns_inactive() {
        let (mut e, _sched) = engine();
        let s = fresh_session_id();
        e.edit_config("candidate", s, Operation::Merge, json!({"x": 1})).unwrap();
        e.commit("candidate", confirmed_req(s, true, None, None)).await.unwrap();

        let outcome = e.commit("candidate", confirmed_req(s, false, None, None)).await.unwrap();
        assert!(outcome.confirming);
        assert_eq!(e.confirmed_state(), ConfirmedCommitState::Inactive);
        assert!(!e.exists("rollback"));
    }

    #[tokio::test]
    async fn timer_fired_rolls_back_to_preconfirmed_contents() {
        let (mut e, _sched) = engine();
        let s = fresh_session_id();
        e.edit_config("running", s, Operation::Merge, json!({"x": 0})).unwrap();
        e.edit_config("candidate", s, Operation::Merge, json!({"x": 0})).unwrap();
        e.commit("candidate", confirmed_req(s, false, None, None)).await.unwrap();

        e.edit_config("candidate", s, Operation::Merge, json!({"x": 1})).unwrap();
        e.commit("candidate", confirmed_req(s, true, None, None)).await.unwrap();
        assert_eq!(e.get_config("running", "/").unwrap(), json!({"x": 1}));

        let timer = e.confirmed.timer().unwrap();
        let report = e.on_timer_fired(timer).await.unwrap();
        assert!(report.is_success());
        assert_eq!(e.confirmed_state(), ConfirmedCommitState::Inactive);
        assert_eq!(e.get_config("running", "/").unwrap(), json!({"x": 0}));
        assert!(!e.exists("rollback"));
    }

    #[tokio::test]
    async fn stale_timer_id_after_confirming_commit_is_a_no_op() {
        let (mut e, _sched) = engine();
        let s = fresh_session_id();
        e.edit_config("candidate", s, Operation::Merge, json!({"x": 1})).unwrap();
        e.commit("candidate", confirmed_req(s, true, None, None)).await.unwrap();
        let stale_timer = e.confirmed.timer().unwrap();

        e.commit("candidate", confirmed_req(s, false, None, None)).await.unwrap();
        assert_eq!(e.confirmed_state(), ConfirmedCommitState::Inactive);

        assert!(e.on_timer_fired(stale_timer).await.is_none());
    }

    #[tokio::test]
    async fn persistent_confirming_commit_from_other_session_succeeds() {
        let (mut e, _sched) = engine();
        let s1 = fresh_session_id();
        let s2 = fresh_session_id();
        e.edit_config("candidate", s1, Operation::Merge, json!({"x": 1})).unwrap();
        e.commit("candidate", confirmed_req(s1, true, Some("X"), None)).await.unwrap();
        assert_eq!(e.confirmed_state(), ConfirmedCommitState::Persistent);

        let outcome = e.commit("candidate", confirmed_req(s2, false, None, Some("X"))).await.unwrap();
        assert!(outcome.confirming);
        assert_eq!(e.confirmed_state(), ConfirmedCommitState::Inactive);
    }

    #[tokio::test]
    async fn cancel_commit_without_persist_id_on_persistent_sequence_fails() {
        let (mut e, _sched) = engine();
        let s = fresh_session_id();
        e.edit_config("candidate", s, Operation::Merge, json!({"x": 1})).unwrap();
        e.commit("candidate", confirmed_req(s, true, Some("X"), None)).await.unwrap();

        let err = e.cancel_commit(None).await.unwrap_err();
        assert_eq!(err, EngineError::PersistIdRequired);
    }

    #[tokio::test]
    async fn cancel_commit_on_ephemeral_rolls_back() {
        let (mut e, _sched) = engine();
        let s = fresh_session_id();
        e.edit_config("candidate", s, Operation::Merge, json!({"x": 1})).unwrap();
        e.commit("candidate", confirmed_req(s, true, None, None)).await.unwrap();

        let report = e.cancel_commit(None).await.unwrap();
        assert!(report.is_success());
        assert_eq!(e.confirmed_state(), ConfirmedCommitState::Inactive);
    }

    #[tokio::test]
    async fn cancel_commit_with_no_sequence_active_fails() {
        let (mut e, _sched) = engine();
        let err = e.cancel_commit(None).await.unwrap_err();
        assert_eq!(err, EngineError::NoConfirmedCommitInProgress);
    }

    #[tokio::test]
    async fn session_destruction_rolls_back_owned_ephemeral_sequence() {
        let (mut e, _sched) = engine();
        let s = fresh_session_id();
        e.edit_config("candidate", s, Operation::Merge, json!({"x": 1})).unwrap();
        e.commit("candidate", confirmed_req(s, true, None, None)).await.unwrap();

        let report = e.on_session_destroyed(s).await;
        assert!(report.unwrap().is_success());
        assert_eq!(e.confirmed_state(), ConfirmedCommitState::Inactive);
    }

    #[tokio::test]
    async fn session_destruction_releases_locks_even_without_a_confirmed_sequence() {
        let (mut e, _sched) = engine();
        let s = fresh_session_id();
        e.lock("running", s).unwrap();
        assert_eq!(e.on_session_destroyed(s).await, None);
        assert_eq!(e.islocked("running"), None);
    }

    #[tokio::test]
    async fn close_session_releases_locks_without_touching_confirmed_state() {
        let (mut e, _sched) = engine();
        let s = fresh_session_id();
        e.lock("candidate", s).unwrap();
        e.edit_config("candidate", s, Operation::Merge, json!({"x": 1})).unwrap();
        e.commit("candidate", confirmed_req(s, true, None, None)).await.unwrap();

        e.close_session(s);
        assert_eq!(e.islocked("candidate"), None);
        assert_eq!(e.confirmed_state(), ConfirmedCommitState::Ephemeral);
    }

    #[tokio::test]
    async fn edit_config_rejects_state_only_payload() {
        let schema = SchemaRegistry::from_str(r#"node "x" { kind = "leaf", config = false }"#).unwrap();
        let scheduler = Arc::new(FakeScheduler::new());
        let mut e = Engine::bootstrap(schema, PluginRegistry::new(), scheduler);
        let s = fresh_session_id();
        let err = e.edit_config("candidate", s, Operation::Merge, json!({"x": 1})).unwrap_err();
        assert!(matches!(err, EngineError::Invalid(_)));
    }

    #[tokio::test]
    async fn unlock_by_non_holder_maps_to_lock_denied_with_pid_piddb_context() {
        let (mut e, _sched) = engine();
        let s1 = fresh_session_id();
        let s2 = fresh_session_id();
        e.lock("running", s1).unwrap();
        let err = e.unlock("running", s2).unwrap_err();
        let rpc_err = err.to_rpc_error();
        assert_eq!(rpc_err.tag, "lock-denied");
        assert_eq!(rpc_err.context.as_deref(), Some(format!("pid={s2} piddb={s1}").as_str()));
    }

    #[tokio::test]
    async fn edit_config_denies_when_locked_by_another_session() {
        let (mut e, _sched) = engine();
        let s1 = fresh_session_id();
        let s2 = fresh_session_id();
        e.lock("candidate", s1).unwrap();
        let err = e.edit_config("candidate", s2, Operation::Merge, json!({"x": 1})).unwrap_err();
        assert!(matches!(err, EngineError::Storage(ncfd_storage::StorageError::LockDenied(_))));
    }

    #[tokio::test]
    async fn copy_config_denies_when_target_locked_by_another_session() {
        let (mut e, _sched) = engine();
        let s1 = fresh_session_id();
        let s2 = fresh_session_id();
        e.lock("startup", s1).unwrap();
        let err = e.copy_config("running", "startup", s2).unwrap_err();
        assert!(matches!(err, EngineError::Storage(ncfd_storage::StorageError::LockDenied(_))));
    }

    #[tokio::test]
    async fn copy_config_allowed_when_target_locked_by_caller() {
        let (mut e, _sched) = engine();
        let s1 = fresh_session_id();
        e.lock("startup", s1).unwrap();
        e.edit_config("running", s1, Operation::Merge, json!({"x": 1})).unwrap();
        e.copy_config("running", "startup", s1).unwrap();
        assert_eq!(e.get_config("startup", "/").unwrap(), json!({"x": 1}));
    }

    #[tokio::test]
    async fn delete_config_denies_when_target_locked_by_another_session() {
        let (mut e, _sched) = engine();
        let s1 = fresh_session_id();
        let s2 = fresh_session_id();
        e.lock("startup", s1).unwrap();
        let err = e.delete_config("startup", s2).unwrap_err();
        assert!(matches!(err, EngineError::Storage(ncfd_storage::StorageError::LockDenied(_))));
    }

    #[tokio::test]
    async fn commit_denies_when_candidate_locked_by_another_session() {
        let (mut e, _sched) = engine();
        let s1 = fresh_session_id();
        let s2 = fresh_session_id();
        e.lock("candidate", s1).unwrap();
        let err = e.commit("candidate", confirmed_req(s2, false, None, None)).await.unwrap_err();
        assert!(matches!(err, EngineError::Storage(ncfd_storage::StorageError::LockDenied(_))));
    }
}
