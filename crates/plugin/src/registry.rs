// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered plugin registry (§4.3 step 3, §4.6).

use crate::traits::{Plugin, PluginError};
use crate::transaction::TransactionContext;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugins are invoked in the order they are registered for forward
    /// phases, and in reverse for `trans_abort` (§4.6).
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        info!(plugin = plugin.name(), "plugin registered");
        self.plugins.push(plugin);
    }

    pub async fn init_all(&self) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            plugin.init().await?;
        }
        Ok(())
    }

    pub async fn start_all(&self) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            plugin.start().await?;
        }
        Ok(())
    }

    pub async fn statedata(&self, path: &str, subtree: &mut Value) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            plugin.statedata(path, subtree).await?;
        }
        Ok(())
    }

    pub async fn trans_begin(&self, txn: &TransactionContext) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            plugin.trans_begin(txn).await?;
        }
        Ok(())
    }

    /// Runs `trans_validate` in registration order. On the first failure,
    /// invokes `trans_abort` on every plugin that already ran `trans_begin`
    /// (all of them, since `trans_begin` is a prerequisite), in reverse
    /// order, and returns the failure (§4.3 step 3).
    pub async fn trans_validate(&self, txn: &TransactionContext) -> Result<(), PluginError> {
        for (i, plugin) in self.plugins.iter().enumerate() {
            if let Err(e) = plugin.trans_validate(txn).await {
                warn!(plugin = plugin.name(), error = %e, "trans_validate rejected transaction");
                for already_called in self.plugins[..=i].iter().rev() {
                    already_called.trans_abort(txn).await;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    pub async fn trans_complete(&self, txn: &TransactionContext) -> Result<(), PluginError> {
        for (i, plugin) in self.plugins.iter().enumerate() {
            if let Err(e) = plugin.trans_complete(txn).await {
                warn!(plugin = plugin.name(), error = %e, "trans_complete vetoed transaction");
                for already_called in self.plugins[..=i].iter().rev() {
                    already_called.trans_abort(txn).await;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// A `trans_commit` failure is logged and does not roll back the
    /// already-installed datastore content (§4.3 step 6): every plugin
    /// still runs regardless of earlier failures, and the caller gets back
    /// the list of plugins that failed rather than a single error.
    pub async fn trans_commit(&self, txn: &TransactionContext) -> Vec<(String, PluginError)> {
        let mut failures = Vec::new();
        for plugin in &self.plugins {
            if let Err(e) = plugin.trans_commit(txn).await {
                warn!(plugin = plugin.name(), error = %e, "trans_commit failed (partial failure, running config already installed)");
                failures.push((plugin.name().to_string(), e));
            }
        }
        failures
    }

    pub async fn trans_end(&self, txn: &TransactionContext) {
        for plugin in &self.plugins {
            if let Err(e) = plugin.trans_end(txn).await {
                warn!(plugin = plugin.name(), error = %e, "trans_end failed");
            }
        }
    }

    pub async fn rpc(&self, operation: &str, payload: &Value) -> Option<Result<Value, PluginError>> {
        for plugin in &self.plugins {
            if let Some(result) = plugin.rpc(operation, payload).await {
                return Some(result);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingPlugin, RecordingPlugin};
    use serde_json::json;
    use std::sync::Mutex;

    fn txn() -> TransactionContext {
        TransactionContext::new(json!({}), json!({"x": 1}))
    }

    #[tokio::test]
    async fn trans_validate_failure_aborts_already_called_plugins_in_reverse() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(RecordingPlugin::new("first", order.clone())));
        registry.register(Arc::new(FailingPlugin::new("second", order.clone())));
        registry.register(Arc::new(RecordingPlugin::new("third", order.clone())));

        let err = registry.trans_validate(&txn()).await.unwrap_err();
        assert!(matches!(err, PluginError::Rejected(_)));

        // "third" never runs trans_validate (failure halts forward
        // progress); abort runs on "second" then "first", in that order.
        let recorded = order.lock().unwrap().clone();
        assert_eq!(recorded, vec!["validate:first", "validate:second", "abort:second", "abort:first"]);
    }

    #[tokio::test]
    async fn trans_commit_runs_every_plugin_even_after_a_failure() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(FailingPlugin::new("first", order.clone())));
        registry.register(Arc::new(RecordingPlugin::new("second", order.clone())));

        let failures = registry.trans_commit(&txn()).await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "first");
        let recorded = order.lock().unwrap().clone();
        assert_eq!(recorded, vec!["commit:first", "commit:second"]);
    }

    #[tokio::test]
    async fn rpc_dispatch_stops_at_first_claiming_plugin() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(RecordingPlugin::new("unclaimed", order.clone())));
        registry.register(Arc::new(RecordingPlugin::new("claims-ping", order.clone())));

        let result = registry.rpc("ping", &json!(null)).await;
        assert!(result.is_some());
    }
}
