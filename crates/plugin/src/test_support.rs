// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake plugins for exercising `PluginRegistry` ordering without a real
//! transaction backend.

use crate::traits::{Plugin, PluginError};
use crate::transaction::TransactionContext;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Records every phase it is called for as `"{phase}:{name}"`, and claims
/// the `"ping"` RPC if its name is `"claims-ping"`.
pub struct RecordingPlugin {
    name: String,
    order: Arc<Mutex<Vec<String>>>,
}

impl RecordingPlugin {
    pub fn new(name: impl Into<String>, order: Arc<Mutex<Vec<String>>>) -> Self {
        Self { name: name.into(), order }
    }

    fn record(&self, phase: &str) {
        self.order.lock().unwrap_or_else(|e| e.into_inner()).push(format!("{phase}:{}", self.name));
    }
}

#[async_trait]
impl Plugin for RecordingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn trans_validate(&self, _txn: &TransactionContext) -> Result<(), PluginError> {
        self.record("validate");
        Ok(())
    }

    async fn trans_commit(&self, _txn: &TransactionContext) -> Result<(), PluginError> {
        self.record("commit");
        Ok(())
    }

    async fn trans_abort(&self, _txn: &TransactionContext) {
        self.record("abort");
    }

    async fn rpc(&self, operation: &str, _payload: &Value) -> Option<Result<Value, PluginError>> {
        if self.name == "claims-ping" && operation == "ping" {
            Some(Ok(Value::String("pong".to_string())))
        } else {
            None
        }
    }
}

/// Always fails `trans_validate`/`trans_commit`, recording that it was
/// called the same way `RecordingPlugin` does.
pub struct FailingPlugin {
    name: String,
    order: Arc<Mutex<Vec<String>>>,
}

impl FailingPlugin {
    pub fn new(name: impl Into<String>, order: Arc<Mutex<Vec<String>>>) -> Self {
        Self { name: name.into(), order }
    }

    fn record(&self, phase: &str) {
        self.order.lock().unwrap_or_else(|e| e.into_inner()).push(format!("{phase}:{}", self.name));
    }
}

#[async_trait]
impl Plugin for FailingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn trans_validate(&self, _txn: &TransactionContext) -> Result<(), PluginError> {
        self.record("validate");
        Err(PluginError::rejected(format!("{} rejects", self.name)))
    }

    async fn trans_commit(&self, _txn: &TransactionContext) -> Result<(), PluginError> {
        self.record("commit");
        Err(PluginError::rejected(format!("{} rejects", self.name)))
    }

    async fn trans_abort(&self, _txn: &TransactionContext) {
        self.record("abort");
    }
}
