// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The plugin callback trait (§4.6).
//!
//! All hooks are optional: the default implementation of each is a no-op
//! success, so a plugin only overrides the phases it cares about.

use crate::transaction::TransactionContext;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("{0}")]
    Rejected(String),
}

impl PluginError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// A bundle of optional callbacks invoked during specific transaction
/// phases and for state-data augmentation of reads (§4.6).
#[async_trait]
pub trait Plugin: Send + Sync {
    /// A stable name used for logging and for ordering diagnostics.
    fn name(&self) -> &str;

    async fn init(&self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn start(&self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn exit(&self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn reset(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Invoked during `get` to augment the selected subtree with runtime
    /// state nodes (§4.2 `get`).
    async fn statedata(&self, path: &str, subtree: &mut Value) -> Result<(), PluginError> {
        let _ = (path, subtree);
        Ok(())
    }

    async fn trans_begin(&self, txn: &TransactionContext) -> Result<(), PluginError> {
        let _ = txn;
        Ok(())
    }

    async fn trans_validate(&self, txn: &TransactionContext) -> Result<(), PluginError> {
        let _ = txn;
        Ok(())
    }

    async fn trans_complete(&self, txn: &TransactionContext) -> Result<(), PluginError> {
        let _ = txn;
        Ok(())
    }

    /// A failure here is logged but does not roll back the already-applied
    /// datastore replace (§4.3 step 6): callers must not treat it as a
    /// reason to abort.
    async fn trans_commit(&self, txn: &TransactionContext) -> Result<(), PluginError> {
        let _ = txn;
        Ok(())
    }

    async fn trans_end(&self, txn: &TransactionContext) -> Result<(), PluginError> {
        let _ = txn;
        Ok(())
    }

    async fn trans_abort(&self, txn: &TransactionContext) {
        let _ = txn;
    }

    /// Claim a custom RPC operation name. Returning `None` means this
    /// plugin does not handle `operation`, so the dispatcher tries the
    /// next registered plugin.
    async fn rpc(&self, operation: &str, payload: &Value) -> Option<Result<Value, PluginError>> {
        let _ = (operation, payload);
        None
    }
}
