// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup crash recovery (§4.4 "Crash recovery").
//!
//! Distinct from the runtime rollback path in [`crate::Engine::on_timer_fired`]
//! and [`crate::Engine::cancel_commit`]: this runs once, before the daemon
//! starts accepting connections, and is driven by how the process was
//! booted rather than by a live confirmed-commit record (which does not
//! yet exist at this point — the record found on disk, if any, is implied
//! purely by whether `rollback` exists).

use crate::commit::run_commit_pipeline;
use crate::error::EngineError;
use crate::Engine;
use ncfd_core::DatastoreName;
use tracing::info;

/// How the daemon's `running` datastore was populated on this boot, set
/// from the `NCFD_BOOT_SOURCE` environment variable by `ncfd-daemon`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootSource {
    /// `running` was loaded from the prior run's persisted state (the
    /// ordinary restart path).
    Running,
    /// `running` was (re)initialized from `startup` — an operator-directed
    /// reset, or a first boot with no prior state.
    Startup,
}

impl Engine {
    /// Runs once at startup, before the listener binds. If `rollback` is
    /// absent there was no confirmed-commit sequence in flight when the
    /// process last stopped, and this is a no-op. Otherwise resolves the
    /// leftover sequence per `boot_source` (§4.4):
    /// - `Running`: the prior sequence's tentative configuration is still
    ///   what `running` reflects, so affirm it — commit `rollback`'s
    ///   contents (which is a no-op content-wise, since `running` already
    ///   holds them) and delete `rollback`.
    /// - `Startup`: `running` was reset out from under the old sequence,
    ///   so there is nothing left to affirm — just delete `rollback`.
    pub async fn recover_from_crash(&mut self, boot_source: BootSource) -> Result<(), EngineError> {
        if !self.exists(DatastoreName::ROLLBACK) {
            return Ok(());
        }
        match boot_source {
            BootSource::Running => {
                info!("rollback datastore found at startup with boot source running, affirming prior sequence");
                run_commit_pipeline(&mut self.storage, &self.schema, &self.plugins, DatastoreName::ROLLBACK).await?;
                self.storage.remove(DatastoreName::ROLLBACK)?;
            }
            BootSource::Startup => {
                info!("rollback datastore found at startup with boot source startup, discarding prior sequence");
                self.storage.remove(DatastoreName::ROLLBACK)?;
            }
        }
        self.confirmed.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeScheduler;
    use ncfd_core::ConfirmedCommitState;
    use ncfd_plugin::PluginRegistry;
    use ncfd_schema::SchemaRegistry;
    use serde_json::json;
    use std::sync::Arc;

    fn engine_with_leftover_rollback() -> Engine {
        let scheduler = Arc::new(FakeScheduler::new());
        let mut e = Engine::bootstrap(SchemaRegistry::empty(), PluginRegistry::new(), scheduler);
        let s = ncfd_core::test_support::fresh_session_id();
        e.edit_config("running", s, ncfd_core::Operation::Merge, json!({"x": 0})).unwrap();
        e.storage.create("rollback").unwrap();
        e.storage.copy("running", "rollback").unwrap();
        e.edit_config("running", s, ncfd_core::Operation::Merge, json!({"x": 1})).unwrap();
        e
    }

    #[tokio::test]
    async fn no_rollback_datastore_is_a_no_op() {
        let scheduler = Arc::new(FakeScheduler::new());
        let mut e = Engine::bootstrap(SchemaRegistry::empty(), PluginRegistry::new(), scheduler);
        e.recover_from_crash(BootSource::Running).await.unwrap();
        assert!(!e.exists("rollback"));
    }

    #[tokio::test]
    async fn running_boot_source_commits_rollback_contents_and_deletes_it() {
        let mut e = engine_with_leftover_rollback();
        e.recover_from_crash(BootSource::Running).await.unwrap();
        assert!(!e.exists("rollback"));
        assert_eq!(e.get_config("running", "/").unwrap(), json!({"x": 0}));
        assert_eq!(e.confirmed_state(), ConfirmedCommitState::Inactive);
    }

    #[tokio::test]
    async fn startup_boot_source_just_deletes_rollback() {
        let mut e = engine_with_leftover_rollback();
        e.recover_from_crash(BootSource::Startup).await.unwrap();
        assert!(!e.exists("rollback"));
        assert_eq!(e.get_config("running", "/").unwrap(), json!({"x": 1}));
        assert_eq!(e.confirmed_state(), ConfirmedCommitState::Inactive);
    }
}
